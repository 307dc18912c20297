//! Joins between a stream of bindings and the triples of a [Graph].

mod bound;

use crate::pattern::{extract_bindings, is_fully_bound};
use crate::{Graph, QueryContext};
use rdf_pipeline_common::{Pipeline, PipelineStage};
use rdf_pipeline_model::{Bindings, TriplePattern};
use std::sync::Arc;

pub use bound::{bound_join, cached_eval_bgp, nested_loop_bgp_join};

/// Joins every incoming binding with the matches of `pattern`.
///
/// The pattern is instantiated with each binding before it is looked up. A fully instantiated
/// pattern only checks the existence of the triple and emits the incoming binding at most once.
pub fn index_join<G: Graph + ?Sized>(
    source: PipelineStage<Bindings>,
    pattern: TriplePattern,
    graph: Arc<G>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    let context = context.clone();
    engine.merge_map(source, move |bindings| {
        let bound = bindings.bound(&pattern);
        let found = graph.find(&bound, &context);
        if is_fully_bound(&bound) {
            return engine.map(engine.limit(found, 1), move |_| bindings.clone());
        }
        engine.filter_map(found, move |triple| {
            bindings.merge_compatible(&extract_bindings(&bound, &triple)?)
        })
    })
}

/// Folds [index_join] over `patterns` in the given order.
///
/// Without patterns, `source` is returned unchanged.
pub fn index_join_all<G: Graph + ?Sized>(
    source: PipelineStage<Bindings>,
    patterns: Vec<TriplePattern>,
    graph: Arc<G>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    patterns.into_iter().fold(source, |stage, pattern| {
        index_join(stage, pattern, Arc::clone(&graph), context)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryGraph;
    use rdf_pipeline_model::{Literal, NamedNode, Triple, Variable};

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{value}"))
    }

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    async fn graph() -> Arc<MemoryGraph> {
        let graph = MemoryGraph::new(iri("g"));
        for (subject, object) in [("alice", "bob"), ("bob", "carol")] {
            graph
                .insert(Triple::new(iri(subject), iri("knows"), iri(object)))
                .await
                .unwrap();
        }
        Arc::new(graph)
    }

    #[tokio::test]
    async fn empty_pattern_list_is_identity() {
        let context = QueryContext::default();
        let engine = context.engine();
        let source = Bindings::from_iter([(var("x"), Literal::from("a").into())]);

        let joined = index_join_all(engine.of(vec![source.clone()]), vec![], graph().await, &context)
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(joined, vec![source]);
    }

    #[tokio::test]
    async fn joins_through_shared_variables() {
        let context = QueryContext::default();
        let engine = context.engine();
        let patterns = vec![
            TriplePattern {
                subject: var("a").into(),
                predicate: iri("knows").into(),
                object: var("b").into(),
            },
            TriplePattern {
                subject: var("b").into(),
                predicate: iri("knows").into(),
                object: var("c").into(),
            },
        ];

        let joined = index_join_all(
            engine.of(vec![Bindings::new()]),
            patterns,
            graph().await,
            &context,
        )
        .collect_vec()
        .await
        .unwrap();

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].get(&var("c")), Some(&iri("carol").into()));
    }

    #[tokio::test]
    async fn fully_bound_pattern_checks_existence() {
        let context = QueryContext::default();
        let engine = context.engine();
        let pattern = TriplePattern {
            subject: var("a").into(),
            predicate: iri("knows").into(),
            object: iri("bob").into(),
        };
        let source = vec![
            Bindings::from_iter([(var("a"), iri("alice").into())]),
            Bindings::from_iter([(var("a"), iri("carol").into())]),
        ];

        let joined = index_join(engine.of(source.clone()), pattern, graph().await, &context)
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(joined, vec![source[0].clone()]);
    }
}
