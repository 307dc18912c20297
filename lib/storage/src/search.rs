//! Keyword search over the terms of a graph.

use crate::{Graph, QueryContext};
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{TermPattern, TermRef, Triple, TriplePattern, Variable};
use std::sync::Arc;

/// A keyword search over the terms bound to `variable` by `pattern`.
#[derive(Clone, Debug, PartialEq)]
pub struct FullTextSearchQuery {
    /// The pattern whose matches are searched.
    pub pattern: TriplePattern,
    /// The variable of `pattern` whose terms are searched.
    pub variable: Variable,
    /// The keywords. Matching is case-insensitive.
    pub keywords: Vec<String>,
    /// Whether all keywords must match.
    pub match_all: bool,
    pub min_relevance: Option<f64>,
    pub max_relevance: Option<f64>,
    pub min_rank: Option<u64>,
    pub max_rank: Option<u64>,
}

impl FullTextSearchQuery {
    pub fn new(pattern: TriplePattern, variable: Variable, keywords: Vec<String>) -> Self {
        Self {
            pattern,
            variable,
            keywords,
            match_all: false,
            min_relevance: None,
            max_relevance: None,
            min_rank: None,
            max_rank: None,
        }
    }

    /// Whether the results must be ranked.
    pub fn is_ranked(&self) -> bool {
        self.min_rank.is_some() || self.max_rank.is_some()
    }

    /// Checks the consistency of the query.
    pub fn validate(&self) -> Result<(), QueryEvaluationError> {
        if self.keywords.is_empty() {
            return Err(QueryEvaluationError::InvalidSearch(
                "at least one keyword is required".to_owned(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_relevance, self.max_relevance) {
            if min > max {
                return Err(QueryEvaluationError::InvalidSearch(format!(
                    "the minimum relevance {min} is greater than the maximum relevance {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_rank, self.max_rank) {
            if min > max {
                return Err(QueryEvaluationError::InvalidSearch(format!(
                    "the minimum rank {min} is greater than the maximum rank {max}"
                )));
            }
        }
        if search_position(&self.pattern, &self.variable).is_none() {
            return Err(QueryEvaluationError::InvalidSearch(format!(
                "the searched variable {} is not the subject or object of the pattern",
                self.variable
            )));
        }
        Ok(())
    }

    /// Computes the relevance of `text` for this query.
    ///
    /// The relevance is the fraction of the words of `text` that contain at least one keyword. If
    /// [FullTextSearchQuery::match_all] is set, the relevance is zero unless every keyword occurs
    /// in `text`.
    pub fn relevance(&self, text: &str) -> f64 {
        let text = text.to_lowercase();
        let keywords = self
            .keywords
            .iter()
            .map(|keyword| keyword.to_lowercase())
            .collect::<Vec<_>>();

        if self.match_all && !keywords.iter().all(|keyword| text.contains(keyword.as_str())) {
            return 0.0;
        }

        let words = text.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            return 0.0;
        }
        let matched = words
            .iter()
            .filter(|word| keywords.iter().any(|keyword| word.contains(keyword.as_str())))
            .count();
        ratio(matched, words.len())
    }

    fn accepts_relevance(&self, relevance: f64) -> bool {
        relevance > 0.0
            && self.min_relevance.map_or(true, |min| min <= relevance)
            && self.max_relevance.map_or(true, |max| relevance <= max)
    }

    fn accepts_rank(&self, rank: u64) -> bool {
        self.min_rank.map_or(true, |min| min <= rank)
            && self.max_rank.map_or(true, |max| rank <= max)
    }
}

#[allow(clippy::cast_precision_loss, reason = "Word counts are small")]
fn ratio(matched: usize, total: usize) -> f64 {
    matched as f64 / total as f64
}

/// A triple found by a keyword search.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredTriple {
    pub triple: Triple,
    pub relevance: f64,
    /// The rank of the triple among all matches, starting at zero, or `-1` if the search was not
    /// ranked.
    pub rank: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchPosition {
    Subject,
    Object,
}

fn search_position(pattern: &TriplePattern, variable: &Variable) -> Option<SearchPosition> {
    match (&pattern.subject, &pattern.object) {
        (_, TermPattern::Variable(object)) if object == variable => Some(SearchPosition::Object),
        (TermPattern::Variable(subject), _) if subject == variable => {
            Some(SearchPosition::Subject)
        }
        _ => None,
    }
}

fn searchable_text(triple: &Triple, position: SearchPosition) -> Option<String> {
    let term: TermRef<'_> = match position {
        SearchPosition::Subject => triple.subject.as_ref().into(),
        SearchPosition::Object => triple.object.as_ref(),
    };
    match term {
        TermRef::Literal(literal) => Some(literal.value().to_owned()),
        TermRef::NamedNode(node) => Some(node.as_str().to_owned()),
        TermRef::BlankNode(_) => None,
    }
}

/// The search used by graphs without a native full-text index.
///
/// Without rank bounds, matches are streamed with a rank of `-1`. With rank bounds, all matches
/// are materialized and ranked by descending relevance.
pub fn default_full_text_search<G: Graph + ?Sized>(
    graph: Arc<G>,
    query: FullTextSearchQuery,
    context: &QueryContext,
) -> Result<PipelineStage<ScoredTriple>, QueryEvaluationError> {
    query.validate()?;
    let Some(position) = search_position(&query.pattern, &query.variable) else {
        return Err(QueryEvaluationError::InvalidSearch(format!(
            "the searched variable {} is not part of the pattern",
            query.variable
        )));
    };

    let engine = context.engine();
    let query = Arc::new(query);
    let triples = graph.find(&query.pattern, context);

    let scoring_query = Arc::clone(&query);
    let scored = engine.filter_map(triples, move |triple| {
        let relevance = scoring_query.relevance(&searchable_text(&triple, position)?);
        scoring_query
            .accepts_relevance(relevance)
            .then_some(ScoredTriple {
                triple,
                relevance,
                rank: -1,
            })
    });

    if !query.is_ranked() {
        return Ok(scored);
    }

    let ranked = engine.map(engine.collect(scored), move |mut matches| {
        matches.sort_by(|lhs, rhs| rhs.relevance.total_cmp(&lhs.relevance));
        matches
            .into_iter()
            .zip(0_u64..)
            .filter(|(_, rank)| query.accepts_rank(*rank))
            .map(|(scored, rank)| ScoredTriple {
                rank: i64::try_from(rank).unwrap_or(i64::MAX),
                ..scored
            })
            .collect::<Vec<_>>()
    });
    Ok(engine.merge_map(ranked, move |matches| engine.of(matches)))
}
