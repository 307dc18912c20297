//! The default evaluation of basic graph patterns.

use crate::join::index_join_all;
use crate::pattern::{bound_slot_count, pattern_variables};
use crate::{Graph, GraphCapabilities, QueryContext};
use futures::future::try_join_all;
use itertools::Itertools;
use rdf_pipeline_common::{JoinOrdering, Pipeline, PipelineResult, PipelineStage};
use rdf_pipeline_model::{Bindings, NamedNodePattern, TermPattern, TriplePattern, Variable};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::trace;

/// Evaluates a basic graph pattern by folding index joins over its patterns.
///
/// If `graph` can estimate cardinalities, all patterns are estimated concurrently and evaluated
/// in ascending order of their estimate. Ties are broken by preferring patterns with more bound
/// slots. Otherwise, the patterns are ordered according to [QueryHints::join_ordering].
///
/// [QueryHints::join_ordering]: rdf_pipeline_common::QueryHints::join_ordering
pub fn evaluate_bgp<G: Graph + ?Sized>(
    graph: Arc<G>,
    bgp: Vec<TriplePattern>,
    context: &QueryContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    if bgp.is_empty() {
        return engine.of(vec![Bindings::new()]);
    }

    if graph.capabilities().contains(GraphCapabilities::ESTIMATE_CARDINALITY) {
        let estimating_graph = Arc::clone(&graph);
        let ordered = engine.from_future(async move {
            order_by_cardinality(estimating_graph.as_ref(), bgp).await
        });
        let context = context.clone();
        return engine.merge_map(ordered, move |patterns| {
            index_join_all(
                engine.of(vec![Bindings::new()]),
                patterns,
                Arc::clone(&graph),
                &context,
            )
        });
    }

    let patterns = match context.hints().join_ordering {
        JoinOrdering::AsWritten => bgp,
        JoinOrdering::Structural => structural_order(bgp),
    };
    index_join_all(engine.of(vec![Bindings::new()]), patterns, graph, context)
}

/// Orders the patterns by their estimated cardinality.
pub async fn order_by_cardinality<G: Graph + ?Sized>(
    graph: &G,
    bgp: Vec<TriplePattern>,
) -> PipelineResult<Vec<TriplePattern>> {
    let estimates = try_join_all(bgp.iter().map(|pattern| graph.estimate_cardinality(pattern)))
        .await?;
    trace!(graph = %graph.iri(), ?estimates, "Estimated pattern cardinalities");

    Ok(bgp
        .into_iter()
        .zip(estimates)
        .sorted_by(|(lhs, lhs_estimate), (rhs, rhs_estimate)| {
            lhs_estimate
                .cmp(rhs_estimate)
                .then_with(|| bound_slot_count(rhs).cmp(&bound_slot_count(lhs)))
        })
        .map(|(pattern, _)| pattern)
        .collect())
}

/// Orders the patterns without any statistics.
///
/// The cheapest pattern (see [estimate_pattern_cost]) is placed first. Afterward, the cheapest
/// pattern that shares a variable with an already placed pattern is picked. If no such pattern
/// exists, the cheapest remaining pattern starts a new connected component.
pub fn structural_order(mut patterns: Vec<TriplePattern>) -> Vec<TriplePattern> {
    let mut ordered = Vec::with_capacity(patterns.len());
    let mut used_variables = FxHashSet::<Variable>::default();

    while !patterns.is_empty() {
        let connected = patterns
            .iter()
            .enumerate()
            .filter(|(_, pattern)| {
                pattern_variables(pattern)
                    .into_iter()
                    .any(|variable| used_variables.contains(variable))
            })
            .min_by_key(|(_, pattern)| estimate_pattern_cost(pattern))
            .map(|(index, _)| index);
        let next = connected.or_else(|| {
            patterns
                .iter()
                .enumerate()
                .min_by_key(|(_, pattern)| estimate_pattern_cost(pattern))
                .map(|(index, _)| index)
        });
        let Some(next) = next else {
            break;
        };

        let pattern = patterns.remove(next);
        used_variables.extend(pattern_variables(&pattern).into_iter().cloned());
        ordered.push(pattern);
    }

    ordered
}

/// Estimates the cost of a single triple pattern based on the shape of its bound slots.
pub fn estimate_pattern_cost(pattern: &TriplePattern) -> usize {
    let subject_bound = matches!(
        &pattern.subject,
        TermPattern::NamedNode(_) | TermPattern::Literal(_)
    );
    let predicate_bound = matches!(&pattern.predicate, NamedNodePattern::NamedNode(_));
    let object_bound = matches!(
        &pattern.object,
        TermPattern::NamedNode(_) | TermPattern::Literal(_)
    );

    match (subject_bound, predicate_bound, object_bound) {
        (true, true, true) => 1,
        (true, true, false) => 10,
        (true, false, true) => 2,
        (false, true, true) => 10_000,
        (true, false, false) => 100,
        (false, false, false) => 1_000_000_000,
        (false, true, false) => 1_000_000,
        (false, false, true) => 100_000,
    }
}
