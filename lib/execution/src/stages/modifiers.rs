use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, GraphPattern, Variable};
use std::sync::Arc;

/// Builds the stages for a projection, i.e. a (sub-)`SELECT`.
///
/// The variables of the incoming bindings are not in scope inside `inner`. Therefore, `inner` is
/// evaluated once from scratch and its projected solutions are joined with every compatible
/// incoming binding.
pub fn build_project(
    source: PipelineStage<Bindings>,
    inner: &GraphPattern,
    variables: &[Variable],
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let engine = context.engine();
    let solutions = context.build_plan(inner, engine.of(vec![Bindings::new()]))?;
    let variables = Arc::<[Variable]>::from(variables);
    let projected = engine.collect(engine.map(solutions, move |solution| {
        solution.project(&variables)
    }));

    let mut source = Some(source);
    Ok(engine.merge_map(projected, move |projected| {
        let Some(source) = source.take() else {
            return engine.empty();
        };
        let projected = Arc::<[Bindings]>::from(projected);
        engine.merge_map(source, move |bindings| {
            let joined = projected
                .iter()
                .filter_map(|solution| bindings.merge_compatible(solution))
                .collect();
            engine.of(joined)
        })
    }))
}

/// Builds the stage for `OFFSET start LIMIT length`.
pub fn build_slice(
    source: PipelineStage<Bindings>,
    start: usize,
    length: Option<usize>,
    context: &ExecutionContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    let source = if start > 0 {
        engine.skip(source, start)
    } else {
        source
    };
    match length {
        Some(length) => engine.limit(source, length),
        None => source,
    }
}
