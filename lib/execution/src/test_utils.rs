use crate::{ExecutionContext, PlanBuilder, TraversalPathEvaluator};
use rdf_pipeline_common::{Pipeline, QueryEvaluationError, QueryHints};
use rdf_pipeline_functions::FunctionRegistry;
use rdf_pipeline_model::{Bindings, GraphPattern, Literal, NamedNode, Triple, Variable};
use rdf_pipeline_storage::{Dataset, Graph, HashMapDataset, QueryContext};
use std::sync::Arc;

pub fn iri(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

pub fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

pub fn triple(subject: &str, predicate: &str, object: &str) -> Triple {
    Triple::new(iri(subject), iri(predicate), iri(object))
}

pub fn literal_triple(subject: &str, predicate: &str, object: impl Into<Literal>) -> Triple {
    Triple::new(iri(subject), iri(predicate), object.into())
}

/// A dataset whose triples are loaded right before the evaluation.
pub struct Fixture {
    dataset: Arc<HashMapDataset>,
    pending: Vec<(Arc<dyn Graph>, Vec<Triple>)>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            dataset: Arc::new(HashMapDataset::new()),
            pending: Vec::new(),
        }
    }
}

impl Fixture {
    pub fn with_default(mut self, triples: Vec<Triple>) -> Self {
        self.pending.push((self.dataset.default_graph(), triples));
        self
    }

    pub fn with_named(mut self, name: &str, triples: Vec<Triple>) -> Self {
        let graph = self.dataset.create_graph(iri(name)).unwrap();
        self.pending.push((graph, triples));
        self
    }

    pub fn dataset(&self) -> Arc<HashMapDataset> {
        Arc::clone(&self.dataset)
    }

    async fn load(self) -> Arc<HashMapDataset> {
        for (graph, triples) in self.pending {
            for triple in triples {
                graph.insert(triple).await.unwrap();
            }
        }
        self.dataset
    }
}

pub fn engine_context() -> ExecutionContext {
    engine_context_with_functions(FunctionRegistry::new())
}

pub fn engine_context_with_functions(functions: FunctionRegistry) -> ExecutionContext {
    context_for(Arc::new(HashMapDataset::new()), functions)
}

fn context_for(dataset: Arc<HashMapDataset>, functions: FunctionRegistry) -> ExecutionContext {
    ExecutionContext::new(
        QueryContext::new(Default::default(), QueryHints::default()),
        dataset,
        Arc::new(functions),
        Arc::new(PlanBuilder),
        Arc::new(TraversalPathEvaluator),
    )
}

/// Evaluates `pattern` against a dataset whose default graph contains `triples`.
pub async fn evaluate(
    triples: Vec<Triple>,
    pattern: &GraphPattern,
) -> Result<Vec<Bindings>, QueryEvaluationError> {
    evaluate_dataset(Fixture::default().with_default(triples), pattern).await
}

pub async fn evaluate_dataset(
    fixture: Fixture,
    pattern: &GraphPattern,
) -> Result<Vec<Bindings>, QueryEvaluationError> {
    let dataset = fixture.load().await;
    let context = context_for(dataset, FunctionRegistry::new());
    let engine = context.engine();
    context
        .build_plan(pattern, engine.of(vec![Bindings::new()]))?
        .collect_vec()
        .await
}
