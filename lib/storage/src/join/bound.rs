use crate::pattern::is_fully_bound;
use crate::{Graph, GraphCapabilities, QueryContext};
use rdf_pipeline_common::{Pipeline, PipelineStage};
use rdf_pipeline_model::{Bindings, NamedNodePattern, TermPattern, TriplePattern, Variable};
use std::sync::Arc;
use tracing::{debug, trace, warn};

const MARKER: &str = "__bj";

/// Evaluates `bgp` for each incoming binding, batching the bindings into a single
/// [Graph::eval_union] call per batch.
///
/// Graphs without [GraphCapabilities::EVALUATE_UNION] fall back to [nested_loop_bgp_join].
pub fn bound_join<G: Graph + ?Sized>(
    source: PipelineStage<Bindings>,
    bgp: Vec<TriplePattern>,
    graph: Arc<G>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    if !graph
        .capabilities()
        .contains(GraphCapabilities::EVALUATE_UNION)
    {
        return nested_loop_bgp_join(source, bgp, graph, context);
    }

    let engine = context.engine();
    let batch_size = context.hints().bound_join_batch_size;
    let context = context.clone();
    let batches = engine.buffer(source, batch_size);
    engine.merge_map(batches, move |batch| {
        evaluate_batch(batch, &bgp, Arc::clone(&graph), &context)
    })
}

/// Evaluates the instantiated `bgp` once per incoming binding.
pub fn nested_loop_bgp_join<G: Graph + ?Sized>(
    source: PipelineStage<Bindings>,
    bgp: Vec<TriplePattern>,
    graph: Arc<G>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    let context = context.clone();
    engine.merge_map(source, move |bindings| {
        if bindings.is_empty() {
            return cached_eval_bgp(Arc::clone(&graph), bgp.clone(), &context);
        }
        let instantiated = bgp.iter().map(|pattern| bindings.bound(pattern)).collect();
        let solutions = Arc::clone(&graph).eval_bgp(instantiated, &context);
        engine.filter_map(solutions, move |solution| bindings.merge_compatible(&solution))
    })
}

/// Evaluates `bgp` through the [BgpCache](crate::BgpCache) of `context`, if there is one.
pub fn cached_eval_bgp<G: Graph + ?Sized>(
    graph: Arc<G>,
    bgp: Vec<TriplePattern>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    let Some(cache) = context.cache().cloned() else {
        return graph.eval_bgp(bgp, context);
    };

    if let Some(solutions) = cache.get(graph.iri(), &bgp) {
        debug!(graph = %graph.iri(), "Using cached basic graph pattern solutions");
        return engine.of(solutions.as_ref().clone());
    }

    let iri = graph.iri().clone();
    let solutions = engine.collect(Arc::clone(&graph).eval_bgp(bgp.clone(), context));
    let cached = engine.map(solutions, move |solutions| {
        cache.insert(&iri, &bgp, solutions.clone());
        solutions
    });
    engine.merge_map(cached, move |solutions| engine.of(solutions))
}

fn evaluate_batch<G: Graph + ?Sized>(
    batch: Vec<Bindings>,
    bgp: &[TriplePattern],
    graph: Arc<G>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    if let [single] = batch.as_slice() {
        if single.is_empty() {
            return cached_eval_bgp(graph, bgp.to_vec(), context);
        }
    }

    let mut stages = Vec::new();
    let mut union = Vec::with_capacity(batch.len());
    let mut union_sources = Vec::with_capacity(batch.len());
    for (index, bindings) in batch.into_iter().enumerate() {
        let instantiated = bgp
            .iter()
            .map(|pattern| bindings.bound(pattern))
            .collect::<Vec<_>>();
        if instantiated.iter().all(is_fully_bound) {
            let solutions = Arc::clone(&graph).eval_bgp(instantiated, context);
            stages.push(engine.filter_map(solutions, move |solution| {
                bindings.merge_compatible(&solution)
            }));
            continue;
        }
        union.push(
            instantiated
                .iter()
                .map(|pattern| mark_pattern(pattern, index))
                .collect(),
        );
        union_sources.push((index, bindings));
    }

    if !union.is_empty() {
        trace!(
            graph = %graph.iri(),
            size = union.len(),
            "Evaluating bound join batch"
        );
        let solutions = graph.eval_union(union, context);
        stages.push(engine.filter_map(solutions, move |solution| {
            let (index, unmarked) = unmark_solution(&solution)?;
            let Some((_, bindings)) = union_sources.iter().find(|(source, _)| *source == index)
            else {
                warn!(index, "Dropping bound join row with an unknown marker");
                return None;
            };
            bindings.merge_compatible(&unmarked)
        }));
    }

    engine.merge(stages)
}

fn mark_variable(variable: &Variable, index: usize) -> Variable {
    Variable::new_unchecked(format!("{}{MARKER}{index}", variable.as_str()))
}

fn mark_pattern(pattern: &TriplePattern, index: usize) -> TriplePattern {
    let mark_term = |term: &TermPattern| match term {
        TermPattern::Variable(variable) => TermPattern::Variable(mark_variable(variable, index)),
        term => term.clone(),
    };
    TriplePattern {
        subject: mark_term(&pattern.subject),
        predicate: match &pattern.predicate {
            NamedNodePattern::Variable(variable) => {
                NamedNodePattern::Variable(mark_variable(variable, index))
            }
            predicate => predicate.clone(),
        },
        object: mark_term(&pattern.object),
    }
}

/// Strips the markers of a solution returned by [Graph::eval_union].
///
/// Returns [None] if a variable has no marker or the markers disagree.
fn unmark_solution(solution: &Bindings) -> Option<(usize, Bindings)> {
    let mut marker = None;
    let mut consistent = true;
    let unmarked = solution.map_variables(|variable, _| {
        let parsed = variable
            .as_str()
            .rsplit_once(MARKER)
            .and_then(|(name, index)| Some((name, index.parse::<usize>().ok()?)));
        let Some((name, index)) = parsed else {
            consistent = false;
            return None;
        };
        if *marker.get_or_insert(index) != index {
            consistent = false;
        }
        Some(Variable::new_unchecked(name))
    });

    match marker {
        Some(index) if consistent => Some((index, unmarked)),
        _ => {
            warn!(%solution, "Dropping bound join row without a consistent marker");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{index_join, BgpCache, MemoryGraph};
    use rdf_pipeline_common::QueryHints;
    use rdf_pipeline_model::{Literal, NamedNode, Triple};

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{value}"))
    }

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    async fn graph(capabilities: GraphCapabilities) -> Arc<MemoryGraph> {
        let graph = MemoryGraph::new(iri("g")).with_capabilities(capabilities);
        for (subject, object) in [(1_i64, "a"), (2, "b")] {
            graph
                .insert(Triple::new(
                    iri(&subject.to_string()),
                    iri("p"),
                    Literal::from(object),
                ))
                .await
                .unwrap();
        }
        Arc::new(graph)
    }

    fn pattern() -> TriplePattern {
        TriplePattern {
            subject: var("x").into(),
            predicate: iri("p").into(),
            object: var("y").into(),
        }
    }

    fn source() -> Vec<Bindings> {
        vec![
            Bindings::from_iter([(var("x"), iri("1").into())]),
            Bindings::from_iter([(var("x"), iri("2").into())]),
        ]
    }

    fn sorted(mut solutions: Vec<Bindings>) -> Vec<String> {
        let mut rendered = solutions.drain(..).map(|s| s.to_string()).collect::<Vec<_>>();
        rendered.sort();
        rendered
    }

    #[tokio::test]
    async fn bound_join_equals_index_join() {
        let graph = graph(GraphCapabilities::ALL).await;
        let context = QueryContext::default();
        let engine = context.engine();

        let bound = bound_join(
            engine.of(source()),
            vec![pattern()],
            Arc::clone(&graph),
            &context,
        )
        .collect_vec()
        .await
        .unwrap();
        let indexed = index_join(engine.of(source()), pattern(), graph, &context)
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(bound.len(), 2);
        assert_eq!(sorted(bound), sorted(indexed));
    }

    #[tokio::test]
    async fn small_batches_produce_same_solutions() {
        let graph = graph(GraphCapabilities::ALL).await;
        let context = QueryContext::default()
            .with_hints(QueryHints::default().with_bound_join_batch_size(1));
        let engine = context.engine();

        let solutions = bound_join(engine.of(source()), vec![pattern()], graph, &context)
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(solutions.len(), 2);
        assert!(solutions.iter().all(|solution| solution.has(&var("y"))));
    }

    #[tokio::test]
    async fn falls_back_without_union_support() {
        let graph = graph(GraphCapabilities::NONE).await;
        let context = QueryContext::default();
        let engine = context.engine();

        let solutions = bound_join(engine.of(source()), vec![pattern()], graph, &context)
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(solutions.len(), 2);
    }

    #[tokio::test]
    async fn unbound_evaluation_fills_cache() {
        let graph = graph(GraphCapabilities::ALL).await;
        let cache = Arc::new(BgpCache::new(4));
        let context = QueryContext::default()
            .with_hints(QueryHints::default().with_cache(true))
            .with_cache(Some(Arc::clone(&cache)));
        let engine = context.engine();

        let solutions = bound_join(
            engine.of(vec![Bindings::new()]),
            vec![pattern()],
            graph,
            &context,
        )
        .collect_vec()
        .await
        .unwrap();

        assert_eq!(solutions.len(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rows_with_mixed_markers_are_dropped() {
        let mixed = Bindings::from_iter([
            (mark_variable(&var("x"), 0), Literal::from("a").into()),
            (mark_variable(&var("y"), 1), Literal::from("b").into()),
        ]);
        let unmarked = Bindings::from_iter([(var("x"), Literal::from("a").into())]);
        let marked = Bindings::from_iter([(mark_variable(&var("x"), 3), Literal::from("a").into())]);

        assert!(unmark_solution(&mixed).is_none());
        assert!(unmark_solution(&unmarked).is_none());
        assert_eq!(unmark_solution(&marked), Some((3, unmarked)));
    }
}
