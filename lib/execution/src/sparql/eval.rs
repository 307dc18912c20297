use crate::results::{QueryResults, QuerySolutionStream, QueryTripleStream};
use crate::sparql::QueryOptions;
use crate::stages::build_bgp;
use crate::ExecutionContext;
use itertools::Itertools;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, GraphPattern, Query, Term, TriplePattern, Variable};
use std::sync::Arc;
use tracing::debug;

/// Evaluates a SPARQL query.
///
/// The `FROM` and `FROM NAMED` clauses of the query replace the active graph and the visible
/// named graphs of `context`. Solutions are produced lazily while the results are consumed.
pub async fn evaluate_query(
    query: &Query,
    context: &ExecutionContext,
    options: QueryOptions,
) -> Result<QueryResults, QueryEvaluationError> {
    let context = match options.hints {
        Some(hints) => context.with_hints(hints),
        None => context.clone(),
    };
    match query {
        Query::Select {
            dataset, pattern, ..
        } => {
            debug!("Evaluating SELECT query");
            let context = context.with_query_dataset(dataset.as_ref());
            let stream = graph_pattern_to_stream(pattern, &context)?;
            Ok(QueryResults::Solutions(stream))
        }
        Query::Construct {
            template,
            dataset,
            pattern,
            ..
        } => {
            debug!(template = template.len(), "Evaluating CONSTRUCT query");
            let context = context.with_query_dataset(dataset.as_ref());
            let stream = graph_pattern_to_stream(pattern, &context)?;
            Ok(QueryResults::Graph(QueryTripleStream::new(
                template.clone(),
                stream,
            )))
        }
        Query::Ask {
            dataset, pattern, ..
        } => {
            debug!("Evaluating ASK query");
            let context = context.with_query_dataset(dataset.as_ref());
            let engine = context.engine();
            let solutions = context.build_plan(pattern, engine.of(vec![Bindings::new()]))?;
            let first = engine.limit(solutions, 1).collect_vec().await?;
            Ok(QueryResults::Boolean(!first.is_empty()))
        }
        Query::Describe {
            dataset, pattern, ..
        } => {
            debug!("Evaluating DESCRIBE query");
            let context = context.with_query_dataset(dataset.as_ref());
            describe(pattern, &context)
        }
    }
}

/// Builds the plan for `pattern` and exposes its solutions over the in-scope variables.
fn graph_pattern_to_stream(
    pattern: &GraphPattern,
    context: &ExecutionContext,
) -> Result<QuerySolutionStream, QueryEvaluationError> {
    let engine = context.engine();
    let stage = context.build_plan(pattern, engine.of(vec![Bindings::new()]))?;
    Ok(QuerySolutionStream::new(in_scope_variables(pattern), stage))
}

fn in_scope_variables(pattern: &GraphPattern) -> Arc<[Variable]> {
    let mut variables = Vec::new();
    pattern.on_in_scope_variable(|variable| variables.push(variable.clone()));
    variables.into_iter().unique().collect()
}

/// Describes every IRI and blank node that appears in the solutions of `pattern` by its outgoing
/// triples in the active graph.
fn describe(
    pattern: &GraphPattern,
    context: &ExecutionContext,
) -> Result<QueryResults, QueryEvaluationError> {
    let engine = context.engine();
    let [subject, predicate, object] =
        ["__describe_s", "__describe_p", "__describe_o"].map(Variable::new_unchecked);

    let solutions = context.build_plan(pattern, engine.of(vec![Bindings::new()]))?;
    let resources = described_resources(solutions, subject.clone(), context);
    let outgoing = TriplePattern {
        subject: subject.clone().into(),
        predicate: predicate.clone().into(),
        object: object.clone().into(),
    };
    let triples = build_bgp(resources, &[outgoing.clone()], context)?;

    let stream = QuerySolutionStream::new(Arc::new([subject, predicate, object]), triples);
    Ok(QueryResults::Graph(QueryTripleStream::new(
        vec![outgoing],
        stream,
    )))
}

/// Binds `variable` to each distinct resource of `solutions`.
fn described_resources(
    solutions: PipelineStage<Bindings>,
    variable: Variable,
    context: &ExecutionContext,
) -> PipelineStage<Bindings> {
    let engine = context.engine();
    let resources = engine.merge_map(solutions, move |solution| {
        let resources = solution
            .values()
            .filter(|term| matches!(term, Term::NamedNode(_) | Term::BlankNode(_)))
            .map(|term| Bindings::from_iter([(variable.clone(), term.clone())]))
            .collect();
        engine.of(resources)
    });
    engine.distinct(resources, crate::stages::distinct_key)
}
