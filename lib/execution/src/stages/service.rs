use crate::{ActiveGraph, ExecutionContext};
use rdf_pipeline_common::{CatchHandler, Pipeline, PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, GraphPattern, NamedNode, NamedNodePattern, Term};
use tracing::{debug, warn};

/// Builds the stage for `SERVICE name { inner }`.
///
/// Endpoints are graphs of the dataset. An endpoint that is not known yet is registered as an
/// empty graph. With `silent`, failures of the endpoint result in no solutions instead of an
/// error.
pub fn build_service(
    source: PipelineStage<Bindings>,
    name: &NamedNodePattern,
    inner: &GraphPattern,
    silent: bool,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let engine = context.engine();
    let stage = match name {
        NamedNodePattern::NamedNode(endpoint) => {
            match endpoint_plan(source, endpoint, inner, context) {
                Ok(stage) => stage,
                Err(error) if silent => {
                    warn!(%endpoint, %error, "Ignoring failing silent service");
                    return Ok(engine.empty());
                }
                Err(error) => return Err(error),
            }
        }
        NamedNodePattern::Variable(variable) => {
            let variable = variable.clone();
            let inner = inner.clone();
            let context = context.clone();
            engine.merge_map(source, move |bindings| {
                let endpoint = match bindings.get(&variable) {
                    Some(Term::NamedNode(endpoint)) => endpoint.clone(),
                    _ => return engine.error(QueryEvaluationError::UnboundService),
                };
                endpoint_plan(engine.of(vec![bindings]), &endpoint, &inner, &context)
                    .unwrap_or_else(|error| engine.error(error))
            })
        }
    };

    if !silent {
        return Ok(stage);
    }
    let handler: CatchHandler<Bindings> = Box::new(move |error| {
        warn!(%error, "Ignoring failing silent service");
        engine.empty()
    });
    Ok(engine.catch(stage, Some(handler)))
}

fn endpoint_plan(
    source: PipelineStage<Bindings>,
    endpoint: &NamedNode,
    inner: &GraphPattern,
    context: &ExecutionContext,
) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
    let dataset = context.dataset();
    if !dataset.has_named_graph(endpoint) {
        debug!(%endpoint, "Registering unknown service endpoint");
        match dataset.create_graph(endpoint.clone()) {
            Ok(_) | Err(QueryEvaluationError::GraphAlreadyExists(_)) => {}
            Err(error) => return Err(error),
        }
    }
    context
        .with_active_graph(ActiveGraph::Named(endpoint.clone()))
        .build_plan(inner, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{evaluate_dataset, iri, triple, var, Fixture};
    use rdf_pipeline_model::TriplePattern;
    use rdf_pipeline_storage::Dataset;

    fn service(name: NamedNodePattern, silent: bool) -> GraphPattern {
        GraphPattern::Service {
            name,
            inner: Box::new(GraphPattern::Bgp {
                patterns: vec![TriplePattern {
                    subject: var("s").into(),
                    predicate: iri("p").into(),
                    object: var("o").into(),
                }],
            }),
            silent,
        }
    }

    #[tokio::test]
    async fn known_endpoint_is_queried() {
        let fixture = Fixture::default().with_named("endpoint", vec![triple("s", "p", "o")]);

        let solutions = evaluate_dataset(fixture, &service(iri("endpoint").into(), false))
            .await
            .unwrap();

        assert_eq!(solutions.len(), 1);
    }

    #[tokio::test]
    async fn unknown_endpoint_is_registered_empty() {
        let fixture = Fixture::default();
        let dataset = fixture.dataset();

        let solutions = evaluate_dataset(fixture, &service(iri("new").into(), false))
            .await
            .unwrap();

        assert!(solutions.is_empty());
        assert!(dataset.has_named_graph(&iri("new")));
    }

    #[tokio::test]
    async fn unbound_service_variable() {
        let loud = evaluate_dataset(Fixture::default(), &service(var("e").into(), false)).await;
        let silent = evaluate_dataset(Fixture::default(), &service(var("e").into(), true)).await;

        assert!(matches!(loud, Err(QueryEvaluationError::UnboundService)));
        assert_eq!(silent.unwrap(), Vec::new());
    }
}
