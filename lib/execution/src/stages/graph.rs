use crate::{ActiveGraph, ExecutionContext};
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, GraphPattern, NamedNodePattern, Variable};
use tracing::debug;

/// Builds the stage for `GRAPH name { inner }`.
///
/// For a graph IRI, `inner` is evaluated against that graph. For a variable, the first incoming
/// binding decides the strategy: if it binds the variable, the graph is looked up for every
/// binding. Otherwise, `inner` is evaluated once per named graph and the solutions are extended
/// with the graph's IRI.
pub fn build_graph(
    source: PipelineStage<Bindings>,
    name: &NamedNodePattern,
    inner: &GraphPattern,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    match name {
        NamedNodePattern::NamedNode(iri) => {
            if !context.is_visible_named_graph(iri) {
                return Err(QueryEvaluationError::GraphDoesNotExist(iri.clone()));
            }
            debug!(graph = %iri, "Building stage for a fixed named graph");
            context
                .with_active_graph(ActiveGraph::Named(iri.clone()))
                .build_plan(inner, source)
        }
        NamedNodePattern::Variable(variable) => {
            let per_binding = context.with_active_graph(ActiveGraph::Bound(variable.clone()));
            per_binding.validate_plan(inner)?;

            let engine = context.engine();
            let context = context.clone();
            let variable = variable.clone();
            let inner = inner.clone();
            Ok(engine.peek(source, move |first, source| {
                if first.is_some_and(|bindings| bindings.has(&variable)) {
                    debug!(%variable, "Resolving the graph for every binding");
                    per_binding.plan_or_fail(&inner, source)
                } else {
                    debug!(%variable, "Evaluating the pattern for every named graph");
                    fan_out(source, variable, inner, context)
                }
            }))
        }
    }
}

/// Evaluates `inner` once per visible named graph.
fn fan_out(
    source: PipelineStage<Bindings>,
    variable: Variable,
    inner: GraphPattern,
    context: ExecutionContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    engine.merge_map(engine.collect(source), move |rows| {
        let stages = context
            .named_graphs()
            .into_iter()
            .map(|iri| {
                let graph_binding = Bindings::from_iter([(variable.clone(), iri.clone().into())]);
                let rows = rows
                    .iter()
                    .filter_map(|row| row.merge_compatible(&graph_binding))
                    .collect();
                context
                    .with_active_graph(ActiveGraph::Named(iri))
                    .plan_or_fail(&inner, engine.of(rows))
            })
            .collect();
        engine.merge(stages)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{evaluate_dataset, iri, triple, var, Fixture};
    use rdf_pipeline_model::TriplePattern;

    fn fixture() -> Fixture {
        Fixture::default()
            .with_default(vec![triple("default", "p", "o")])
            .with_named("g1", vec![triple("s1", "p", "o1")])
            .with_named("g2", vec![triple("s2", "p", "o2")])
    }

    fn inner() -> GraphPattern {
        GraphPattern::Bgp {
            patterns: vec![TriplePattern {
                subject: var("s").into(),
                predicate: iri("p").into(),
                object: var("o").into(),
            }],
        }
    }

    #[tokio::test]
    async fn unknown_graph_fails_at_construction() {
        let pattern = GraphPattern::Graph {
            name: iri("missing").into(),
            inner: Box::new(inner()),
        };

        let result = evaluate_dataset(fixture(), &pattern).await;

        assert!(matches!(result, Err(QueryEvaluationError::GraphDoesNotExist(_))));
    }

    #[tokio::test]
    async fn fixed_graph() {
        let pattern = GraphPattern::Graph {
            name: iri("g1").into(),
            inner: Box::new(inner()),
        };

        let solutions = evaluate_dataset(fixture(), &pattern).await.unwrap();

        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].get(&var("s")), Some(&iri("s1").into()));
    }

    #[tokio::test]
    async fn variable_fans_out_over_named_graphs() {
        let pattern = GraphPattern::Graph {
            name: var("g").into(),
            inner: Box::new(inner()),
        };

        let solutions = evaluate_dataset(fixture(), &pattern).await.unwrap();

        let mut graphs = solutions
            .iter()
            .map(|solution| solution.get(&var("g")).unwrap().to_string())
            .collect::<Vec<_>>();
        graphs.sort();
        assert_eq!(
            graphs,
            vec!["<http://example.com/g1>", "<http://example.com/g2>"]
        );
    }

    #[tokio::test]
    async fn bound_variable_selects_graph_per_binding() {
        let pattern = GraphPattern::Join {
            left: Box::new(GraphPattern::Values {
                variables: vec![var("g")],
                bindings: vec![vec![Some(iri("g2").into())]],
            }),
            right: Box::new(GraphPattern::Graph {
                name: var("g").into(),
                inner: Box::new(inner()),
            }),
        };

        let solutions = evaluate_dataset(fixture(), &pattern).await.unwrap();

        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].get(&var("s")), Some(&iri("s2").into()));
    }
}
