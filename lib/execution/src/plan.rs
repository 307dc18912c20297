use crate::stages::{
    build_bgp, build_distinct, build_extend, build_filter, build_graph, build_group, build_join,
    build_left_join, build_minus, build_order_by, build_paths, build_project, build_reduced,
    build_service, build_slice, build_union, build_values, GroupKey, PathTriple,
};
use crate::ExecutionContext;
use rdf_pipeline_common::{PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, GraphPattern};
use std::fmt::Debug;
use tracing::trace;

/// Builds the stages for a graph pattern.
///
/// Stage builders call back into the dispatcher (through [ExecutionContext::build_plan]) for
/// their nested patterns. This allows replacing the translation of individual patterns without
/// touching the builders.
pub trait PlanDispatcher: Debug + Send + Sync {
    /// Builds the stages that evaluate `pattern` for every binding of `source`.
    ///
    /// The returned stage yields the solutions of `pattern` joined with the binding they were
    /// computed for.
    fn build_plan(
        &self,
        pattern: &GraphPattern,
        context: &ExecutionContext,
        source: PipelineStage<Bindings>,
    ) -> Result<PipelineStage<Bindings>, QueryEvaluationError>;
}

/// The default [PlanDispatcher] that translates every [GraphPattern] with the built-in stage
/// builders.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanBuilder;

impl PlanDispatcher for PlanBuilder {
    fn build_plan(
        &self,
        pattern: &GraphPattern,
        context: &ExecutionContext,
        source: PipelineStage<Bindings>,
    ) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
        trace!(pattern = %pattern, "Building plan");
        match pattern {
            GraphPattern::Bgp { patterns } => build_bgp(source, patterns, context),
            GraphPattern::Path {
                subject,
                path,
                object,
            } => build_paths(
                source,
                vec![PathTriple::new(subject.clone(), path.clone(), object.clone())],
                context,
            ),
            GraphPattern::Join { left, right } => build_join(source, left, right, context),
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => build_left_join(source, left, right, expression.as_ref(), context),
            GraphPattern::Filter { expr, inner } => {
                let inner = context.build_plan(inner, source)?;
                build_filter(inner, expr, context)
            }
            GraphPattern::Union { left, right } => build_union(source, left, right, context),
            GraphPattern::Graph { name, inner } => build_graph(source, name, inner, context),
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner = context.build_plan(inner, source)?;
                build_extend(inner, variable, expression, context)
            }
            GraphPattern::Minus { left, right } => {
                let left = context.build_plan(left, source)?;
                build_minus(left, right, context)
            }
            GraphPattern::Values {
                variables,
                bindings,
            } => build_values(source, variables, bindings, context),
            GraphPattern::OrderBy { inner, expression } => {
                let inner = context.build_plan(inner, source)?;
                build_order_by(inner, expression, context)
            }
            GraphPattern::Project { inner, variables } => {
                build_project(source, inner, variables, context)
            }
            GraphPattern::Distinct { inner } => {
                let inner = context.build_plan(inner, source)?;
                Ok(build_distinct(inner, context))
            }
            GraphPattern::Reduced { inner } => {
                let inner = context.build_plan(inner, source)?;
                Ok(build_reduced(inner, context))
            }
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => {
                let inner = context.build_plan(inner, source)?;
                Ok(build_slice(inner, *start, *length, context))
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                let inner = context.build_plan(inner, source)?;
                let keys = variables
                    .iter()
                    .cloned()
                    .map(GroupKey::Variable)
                    .collect::<Vec<_>>();
                build_group(inner, &keys, aggregates, context)
            }
            GraphPattern::Service {
                name,
                inner,
                silent,
            } => build_service(source, name, inner, *silent, context),
        }
    }
}
