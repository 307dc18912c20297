use crate::ExecutionContext;
use futures::future::try_join_all;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_functions::{CompiledExpression, EXISTS_PROPERTY};
use rdf_pipeline_model::{Bindings, Expression, GraphPattern};
use std::sync::Arc;

/// Builds the stage for `FILTER(expression)`.
///
/// A binding passes if the effective boolean value of `expression` is `true`. Bindings for which
/// the expression fails are rejected.
pub fn build_filter(
    source: PipelineStage<Bindings>,
    expression: &Expression,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    match expression {
        Expression::Exists(pattern) => build_exists_filter(source, pattern, false, context),
        Expression::Not(inner) => match inner.as_ref() {
            Expression::Exists(pattern) => build_exists_filter(source, pattern, true, context),
            _ => build_expression_filter(source, expression, context),
        },
        _ => build_expression_filter(source, expression, context),
    }
}

/// Keeps a binding iff `pattern` has a solution for it, or has none if `negated` is set.
pub fn build_exists_filter(
    source: PipelineStage<Bindings>,
    pattern: &GraphPattern,
    negated: bool,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    context.validate_plan(pattern)?;
    let engine = context.engine();
    let context = context.clone();
    let pattern = pattern.clone();
    Ok(engine.merge_map(source, move |bindings| {
        let found = engine.collect(exists(&pattern, bindings.clone(), &context));
        engine.filter_map(found, move |found| {
            (found.is_empty() == negated).then(|| bindings.clone())
        })
    }))
}

fn build_expression_filter(
    source: PipelineStage<Bindings>,
    expression: &Expression,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let expression = CompiledExpression::compile(expression, context.functions())?;
    apply_filter(source, Arc::new(expression), context)
}

/// Filters `source` with an already compiled expression.
pub(super) fn apply_filter(
    source: PipelineStage<Bindings>,
    expression: Arc<CompiledExpression>,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let engine = context.engine();
    let source = resolve_exists(source, &expression, context)?;
    Ok(engine.filter_map(source, move |mut bindings| {
        let keep = expression
            .effective_boolean_value(&bindings)
            .unwrap_or(false);
        bindings.remove_property(EXISTS_PROPERTY);
        keep.then_some(bindings)
    }))
}

/// Evaluates the `EXISTS` sub-patterns of `expression` for every binding and attaches the
/// results under [EXISTS_PROPERTY].
pub(super) fn resolve_exists(
    source: PipelineStage<Bindings>,
    expression: &CompiledExpression,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    if expression.exists_patterns().is_empty() {
        return Ok(source);
    }
    for pattern in expression.exists_patterns() {
        context.validate_plan(pattern)?;
    }

    let engine = context.engine();
    let context = context.clone();
    let patterns = Arc::<[GraphPattern]>::from(expression.exists_patterns());
    Ok(engine.merge_map(source, move |bindings| {
        let checks = patterns
            .iter()
            .map(|pattern| exists(pattern, bindings.clone(), &context).collect_vec())
            .collect::<Vec<_>>();
        engine.from_future(async move {
            let results = try_join_all(checks).await?;
            let mut bindings = bindings;
            bindings.set_property(
                EXISTS_PROPERTY,
                results
                    .iter()
                    .map(|solutions| !solutions.is_empty())
                    .collect::<Vec<_>>(),
            );
            Ok(bindings)
        })
    }))
}

/// Evaluates `pattern` for `bindings` up to the first solution.
fn exists(
    pattern: &GraphPattern,
    bindings: Bindings,
    context: &ExecutionContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    engine.limit(context.plan_or_fail(pattern, engine.of(vec![bindings])), 1)
}
