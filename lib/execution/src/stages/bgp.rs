use super::blank_nodes::BlankNodeVariables;
use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::vocab::search;
use rdf_pipeline_model::{
    Bindings, Literal, NamedNodePattern, TermPattern, TriplePattern, Variable,
};
use rdf_pipeline_storage::pattern::extract_bindings;
use rdf_pipeline_storage::{bound_join, FullTextSearchQuery, Graph, QueryContext};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Builds the stage for a basic graph pattern.
///
/// Triples with a predicate of the [search] vocabulary are not matched against the graph.
/// Instead, they configure a keyword search over the pattern that mentions the searched variable.
pub fn build_bgp(
    source: PipelineStage<Bindings>,
    patterns: &[TriplePattern],
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let mut blank_nodes = BlankNodeVariables::default();
    let patterns = patterns
        .iter()
        .map(|pattern| blank_nodes.replace(pattern))
        .collect::<Vec<_>>();
    let plan = Arc::new(BgpPlan::try_new(patterns)?);
    debug!(
        patterns = plan.patterns.len(),
        searches = plan.searches.len(),
        "Building basic graph pattern stage"
    );

    let query_context = context.query_context().clone();
    let stage = context.on_active_graph(source, move |source, graph| {
        plan.evaluate(source, graph, &query_context)
    })?;
    Ok(blank_nodes.strip(stage, context.engine()))
}

/// The patterns of a basic graph pattern, split into regular patterns and keyword searches.
#[derive(Debug)]
struct BgpPlan {
    patterns: Vec<TriplePattern>,
    searches: Vec<KeywordSearch>,
}

impl BgpPlan {
    fn try_new(patterns: Vec<TriplePattern>) -> Result<Self, QueryEvaluationError> {
        let (magic, mut patterns): (Vec<_>, Vec<_>) =
            patterns.into_iter().partition(is_search_triple);

        let mut configurations: Vec<SearchConfiguration> = Vec::new();
        for triple in magic {
            let TermPattern::Variable(variable) = &triple.subject else {
                return Err(QueryEvaluationError::InvalidSearch(format!(
                    "the subject of {triple} must be a variable"
                )));
            };
            let index = match configurations
                .iter()
                .position(|configuration| &configuration.variable == variable)
            {
                Some(index) => index,
                None => {
                    configurations.push(SearchConfiguration::new(variable.clone()));
                    configurations.len() - 1
                }
            };
            configurations[index].apply(&triple)?;
        }

        let searches = configurations
            .into_iter()
            .map(|configuration| {
                let position = patterns
                    .iter()
                    .position(|pattern| mentions(pattern, &configuration.variable))
                    .ok_or_else(|| {
                        QueryEvaluationError::InvalidSearch(format!(
                            "no pattern binds the searched variable {}",
                            configuration.variable
                        ))
                    })?;
                KeywordSearch::try_new(configuration, patterns.remove(position))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns, searches })
    }

    fn evaluate(
        &self,
        source: PipelineStage<Bindings>,
        graph: Arc<dyn Graph>,
        context: &QueryContext,
    ) -> PipelineStage<Bindings> {
        let stage = if self.patterns.is_empty() {
            source
        } else {
            bound_join(source, self.patterns.clone(), Arc::clone(&graph), context)
        };
        self.searches.iter().fold(stage, |stage, search| {
            search.evaluate(stage, Arc::clone(&graph), context)
        })
    }
}

fn is_search_triple(pattern: &TriplePattern) -> bool {
    matches!(
        &pattern.predicate,
        NamedNodePattern::NamedNode(predicate) if predicate.as_str().starts_with(search::NAMESPACE)
    )
}

fn mentions(pattern: &TriplePattern, variable: &Variable) -> bool {
    [&pattern.subject, &pattern.object]
        .into_iter()
        .any(|slot| matches!(slot, TermPattern::Variable(v) if v == variable))
}

/// The settings of one keyword search as collected from the magic triples.
#[derive(Debug)]
struct SearchConfiguration {
    variable: Variable,
    keywords: Option<Vec<String>>,
    match_all: bool,
    min_relevance: Option<f64>,
    max_relevance: Option<f64>,
    min_rank: Option<u64>,
    max_rank: Option<u64>,
    relevance: Option<Variable>,
    rank: Option<Variable>,
}

impl SearchConfiguration {
    fn new(variable: Variable) -> Self {
        Self {
            variable,
            keywords: None,
            match_all: false,
            min_relevance: None,
            max_relevance: None,
            min_rank: None,
            max_rank: None,
            relevance: None,
            rank: None,
        }
    }

    fn apply(&mut self, triple: &TriplePattern) -> Result<(), QueryEvaluationError> {
        let NamedNodePattern::NamedNode(predicate) = &triple.predicate else {
            return QueryEvaluationError::internal(format!("{triple} is not a search triple"));
        };
        let predicate = predicate.as_ref();
        let object = &triple.object;

        if predicate == search::SEARCH {
            let keywords = literal(object, triple)?
                .value()
                .split_whitespace()
                .map(str::to_owned)
                .collect();
            set_once(&mut self.keywords, keywords, triple)
        } else if predicate == search::MATCH_ALL_TERMS {
            self.match_all = matches!(literal(object, triple)?.value(), "true" | "1");
            Ok(())
        } else if predicate == search::MIN_RELEVANCE {
            let value = parse_literal(object, triple)?;
            set_once(&mut self.min_relevance, value, triple)
        } else if predicate == search::MAX_RELEVANCE {
            let value = parse_literal(object, triple)?;
            set_once(&mut self.max_relevance, value, triple)
        } else if predicate == search::MIN_RANK {
            let value = parse_literal(object, triple)?;
            set_once(&mut self.min_rank, value, triple)
        } else if predicate == search::MAX_RANK {
            let value = parse_literal(object, triple)?;
            set_once(&mut self.max_rank, value, triple)
        } else if predicate == search::RELEVANCE {
            let variable = variable(object, triple)?;
            set_once(&mut self.relevance, variable, triple)
        } else if predicate == search::RANK {
            let variable = variable(object, triple)?;
            set_once(&mut self.rank, variable, triple)
        } else {
            Err(QueryEvaluationError::InvalidSearch(format!(
                "unknown search predicate in {triple}"
            )))
        }
    }
}

fn literal<'a>(
    object: &'a TermPattern,
    triple: &TriplePattern,
) -> Result<&'a Literal, QueryEvaluationError> {
    match object {
        TermPattern::Literal(literal) => Ok(literal),
        _ => Err(QueryEvaluationError::InvalidSearch(format!(
            "the object of {triple} must be a literal"
        ))),
    }
}

fn parse_literal<T: FromStr>(
    object: &TermPattern,
    triple: &TriplePattern,
) -> Result<T, QueryEvaluationError> {
    literal(object, triple)?.value().parse().map_err(|_| {
        QueryEvaluationError::InvalidSearch(format!("the object of {triple} is not a valid number"))
    })
}

fn variable(object: &TermPattern, triple: &TriplePattern) -> Result<Variable, QueryEvaluationError> {
    match object {
        TermPattern::Variable(variable) => Ok(variable.clone()),
        _ => Err(QueryEvaluationError::InvalidSearch(format!(
            "the object of {triple} must be a variable"
        ))),
    }
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    triple: &TriplePattern,
) -> Result<(), QueryEvaluationError> {
    if slot.is_some() {
        return Err(QueryEvaluationError::InvalidSearch(format!(
            "{triple} configures a setting that has already been set"
        )));
    }
    *slot = Some(value);
    Ok(())
}

/// A keyword search over the matches of a single pattern.
#[derive(Debug)]
struct KeywordSearch {
    query: FullTextSearchQuery,
    relevance: Option<Variable>,
    rank: Option<Variable>,
}

impl KeywordSearch {
    fn try_new(
        configuration: SearchConfiguration,
        pattern: TriplePattern,
    ) -> Result<Self, QueryEvaluationError> {
        let Some(keywords) = configuration.keywords else {
            return Err(QueryEvaluationError::InvalidSearch(format!(
                "the search for {} has no {} triple",
                configuration.variable,
                search::SEARCH
            )));
        };
        let query = FullTextSearchQuery {
            match_all: configuration.match_all,
            min_relevance: configuration.min_relevance,
            max_relevance: configuration.max_relevance,
            min_rank: configuration.min_rank,
            max_rank: configuration.max_rank,
            ..FullTextSearchQuery::new(pattern, configuration.variable, keywords)
        };
        query.validate()?;
        Ok(Self {
            query,
            relevance: configuration.relevance,
            rank: configuration.rank,
        })
    }

    /// Runs the search for every incoming binding.
    ///
    /// The searched variable is left open while the other slots of the pattern are bound. A
    /// searched variable that is already bound must agree with the match.
    fn evaluate(
        &self,
        source: PipelineStage<Bindings>,
        graph: Arc<dyn Graph>,
        context: &QueryContext,
    ) -> PipelineStage<Bindings> {
        let engine = context.engine();
        let context = context.clone();
        let query = self.query.clone();
        let relevance = self.relevance.clone();
        let rank = self.rank.clone();
        engine.merge_map(source, move |bindings| {
            let pattern = bindings
                .filter(|variable, _| variable != &query.variable)
                .bound(&query.pattern);
            let instantiated = FullTextSearchQuery {
                pattern: pattern.clone(),
                ..query.clone()
            };
            let matches = match Arc::clone(&graph).full_text_search(instantiated, &context) {
                Ok(matches) => matches,
                Err(error) => return engine.error(error),
            };

            let relevance = relevance.clone();
            let rank = rank.clone();
            engine.filter_map(matches, move |scored| {
                let found = extract_bindings(&pattern, &scored.triple)?;
                let mut result = bindings.merge_compatible(&found)?;
                if let Some(variable) = &relevance {
                    result.set(variable.clone(), Literal::from(scored.relevance).into());
                }
                if let Some(variable) = &rank {
                    result.set(variable.clone(), Literal::from(scored.rank).into());
                }
                Some(result)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{evaluate, iri, literal_triple, var};
    use rdf_pipeline_model::{GraphPattern, NamedNode};

    fn search_predicate(name: &str) -> NamedNodePattern {
        NamedNode::new_unchecked(format!("{}{name}", search::NAMESPACE)).into()
    }

    fn books() -> Vec<rdf_pipeline_model::Triple> {
        vec![
            literal_triple("good-omens", "title", "Good Omens by Neil Gaiman"),
            literal_triple("coraline", "title", "Coraline by Neil Gaiman"),
            literal_triple("neverwhere", "title", "Neverwhere by Neil"),
            literal_triple("dune", "title", "Dune by Frank Herbert"),
        ]
    }

    fn search_pattern(match_all: bool) -> GraphPattern {
        GraphPattern::Bgp {
            patterns: vec![
                TriplePattern {
                    subject: var("s").into(),
                    predicate: iri("title").into(),
                    object: var("o").into(),
                },
                TriplePattern {
                    subject: var("o").into(),
                    predicate: search_predicate("search"),
                    object: Literal::from("neil gaiman").into(),
                },
                TriplePattern {
                    subject: var("o").into(),
                    predicate: search_predicate("matchAllTerms"),
                    object: Literal::from(match_all).into(),
                },
                TriplePattern {
                    subject: var("o").into(),
                    predicate: search_predicate("relevance"),
                    object: var("score").into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn match_all_requires_every_keyword() {
        let solutions = evaluate(books(), &search_pattern(true)).await.unwrap();

        let mut subjects = solutions
            .iter()
            .map(|solution| solution.get(&var("s")).unwrap().to_string())
            .collect::<Vec<_>>();
        subjects.sort();
        assert_eq!(
            subjects,
            vec![
                "<http://example.com/coraline>",
                "<http://example.com/good-omens>"
            ]
        );
        assert!(solutions.iter().all(|solution| solution.has(&var("score"))));
    }

    #[tokio::test]
    async fn any_keyword_matches_without_match_all() {
        let solutions = evaluate(books(), &search_pattern(false)).await.unwrap();

        assert_eq!(solutions.len(), 3);
    }

    #[tokio::test]
    async fn inconsistent_bounds_are_rejected() {
        let GraphPattern::Bgp { mut patterns } = search_pattern(false) else {
            unreachable!("the search pattern is a basic graph pattern");
        };
        patterns.push(TriplePattern {
            subject: var("o").into(),
            predicate: search_predicate("minRelevance"),
            object: Literal::from(0.8).into(),
        });
        patterns.push(TriplePattern {
            subject: var("o").into(),
            predicate: search_predicate("maxRelevance"),
            object: Literal::from(0.2).into(),
        });

        let result = evaluate(books(), &GraphPattern::Bgp { patterns }).await;

        assert!(matches!(result, Err(QueryEvaluationError::InvalidSearch(_))));
    }

    #[tokio::test]
    async fn search_without_bound_pattern_is_rejected() {
        let pattern = GraphPattern::Bgp {
            patterns: vec![TriplePattern {
                subject: var("o").into(),
                predicate: search_predicate("search"),
                object: Literal::from("neil").into(),
            }],
        };

        let result = evaluate(books(), &pattern).await;

        assert!(matches!(result, Err(QueryEvaluationError::InvalidSearch(_))));
    }

    #[tokio::test]
    async fn blank_nodes_are_not_part_of_the_solutions() {
        let pattern = GraphPattern::Bgp {
            patterns: vec![TriplePattern {
                subject: rdf_pipeline_model::BlankNode::new_unchecked("book").into(),
                predicate: iri("title").into(),
                object: var("title").into(),
            }],
        };

        let solutions = evaluate(books(), &pattern).await.unwrap();

        assert_eq!(solutions.len(), 4);
        assert!(solutions.iter().all(|solution| solution.len() == 1));
    }
}
