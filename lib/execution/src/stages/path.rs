use super::blank_nodes::BlankNodeVariables;
use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, PropertyPathExpression, TermPattern};
use std::sync::Arc;
use tracing::debug;

/// A triple pattern whose predicate is a property path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTriple {
    pub subject: TermPattern,
    pub path: PropertyPathExpression,
    pub object: TermPattern,
}

impl PathTriple {
    pub fn new(subject: TermPattern, path: PropertyPathExpression, object: TermPattern) -> Self {
        Self {
            subject,
            path,
            object,
        }
    }
}

/// Joins the incoming bindings with the solutions of every path triple.
///
/// The paths are evaluated by the [PropertyPathEvaluator](crate::PropertyPathEvaluator) of the
/// context, one after the other, with the variables bound by the incoming binding substituted.
pub fn build_paths(
    source: PipelineStage<Bindings>,
    paths: Vec<PathTriple>,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    debug!(paths = paths.len(), "Building property path stage");
    let mut blank_nodes = BlankNodeVariables::default();
    let paths = paths
        .into_iter()
        .map(|path| PathTriple {
            subject: blank_nodes.replace_in_term(&path.subject),
            object: blank_nodes.replace_in_term(&path.object),
            ..path
        })
        .collect::<Arc<[_]>>();

    let evaluator = Arc::clone(context.path_evaluator());
    let query_context = context.query_context().clone();
    let stage = context.on_active_graph(source, move |source, graph| {
        let engine = query_context.engine();
        paths.iter().cloned().fold(source, |stage, path| {
            let evaluator = Arc::clone(&evaluator);
            let graph = Arc::clone(&graph);
            let query_context = query_context.clone();
            engine.merge_map(stage, move |bindings| {
                let solutions = evaluator.evaluate(
                    Arc::clone(&graph),
                    &bindings.bound_term(&path.subject),
                    &path.path,
                    &bindings.bound_term(&path.object),
                    &query_context,
                );
                engine.filter_map(solutions, move |solution| bindings.merge_compatible(&solution))
            })
        })
    })?;
    Ok(blank_nodes.strip(stage, context.engine()))
}
