use super::filter::apply_filter;
use crate::ExecutionContext;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_functions::CompiledExpression;
use rdf_pipeline_model::{Bindings, Expression, GraphPattern, GroundTerm, Term, Variable};
use std::sync::Arc;

/// Builds the stages for `left . right`.
///
/// The solutions of `left` are the incoming bindings of `right`, so `right` only has to find the
/// solutions that are compatible with them.
pub fn build_join(
    source: PipelineStage<Bindings>,
    left: &GraphPattern,
    right: &GraphPattern,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let left = context.build_plan(left, source)?;
    context.build_plan(right, left)
}

/// Builds the stages for `left OPTIONAL { right FILTER(expression) }`.
///
/// Every solution of `left` is extended with the solutions of `right` that satisfy `expression`.
/// If there are none, the solution of `left` is passed on unchanged.
pub fn build_left_join(
    source: PipelineStage<Bindings>,
    left: &GraphPattern,
    right: &GraphPattern,
    expression: Option<&Expression>,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let left = context.build_plan(left, source)?;
    context.validate_plan(right)?;
    let expression = expression
        .map(|expression| CompiledExpression::compile(expression, context.functions()))
        .transpose()?
        .map(Arc::new);

    let engine = context.engine();
    let context = context.clone();
    let right = right.clone();
    Ok(engine.merge_map(left, move |bindings| {
        let mut matches = context.plan_or_fail(&right, engine.of(vec![bindings.clone()]));
        if let Some(expression) = &expression {
            matches = apply_filter(matches, Arc::clone(expression), &context)
                .unwrap_or_else(|error| engine.error(error));
        }
        engine.default_if_empty(matches, bindings)
    }))
}

/// Builds the stages for `{ left } UNION { right }`.
///
/// Both branches are evaluated for every incoming binding. Their solutions are interleaved.
pub fn build_union(
    source: PipelineStage<Bindings>,
    left: &GraphPattern,
    right: &GraphPattern,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    context.validate_plan(left)?;
    context.validate_plan(right)?;

    let engine = context.engine();
    let context = context.clone();
    let branches = [left.clone(), right.clone()];
    Ok(engine.merge_map(source, move |bindings| {
        let stages = branches
            .iter()
            .map(|branch| context.plan_or_fail(branch, engine.of(vec![bindings.clone()])))
            .collect();
        engine.merge(stages)
    }))
}

/// Builds the stage for an inline `VALUES` block.
///
/// Each incoming binding is joined with every row of the block it is compatible with. Undefined
/// entries leave the variable unbound.
pub fn build_values(
    source: PipelineStage<Bindings>,
    variables: &[Variable],
    rows: &[Vec<Option<GroundTerm>>],
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let rows = rows
        .iter()
        .map(|row| {
            variables
                .iter()
                .zip(row)
                .filter_map(|(variable, value)| {
                    Some((variable.clone(), ground_term(value.as_ref()?)))
                })
                .collect::<Bindings>()
        })
        .collect::<Arc<[_]>>();

    let engine = context.engine();
    Ok(engine.merge_map(source, move |bindings| {
        let joined = rows
            .iter()
            .filter_map(|row| bindings.merge_compatible(row))
            .collect();
        engine.of(joined)
    }))
}

fn ground_term(term: &GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(node) => node.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
    }
}
