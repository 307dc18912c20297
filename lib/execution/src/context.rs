use crate::path::PropertyPathEvaluator;
use crate::plan::PlanDispatcher;
use rdf_pipeline_common::{
    Pipeline, PipelineEngine, PipelineStage, QueryEvaluationError, QueryHints,
};
use rdf_pipeline_functions::FunctionRegistry;
use rdf_pipeline_model::{Bindings, GraphPattern, NamedNode, QueryDataset, Term, Variable};
use rdf_pipeline_storage::{Dataset, Graph, QueryContext};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The graph that the patterns of a (sub-)plan are matched against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveGraph {
    /// The default graph of the dataset.
    Default,
    /// A named graph of the dataset.
    Named(NamedNode),
    /// The merge of several named graphs, e.g., the graphs of a `FROM` clause.
    Union(Vec<NamedNode>),
    /// The graph whose IRI is bound to the variable in each binding.
    Bound(Variable),
}

/// Everything a stage builder needs to know about the evaluation it takes part in.
///
/// A context is cheap to clone. Sub-plans that change the active graph (e.g., `GRAPH`) derive a
/// new context with [ExecutionContext::with_active_graph].
#[derive(Clone)]
pub struct ExecutionContext {
    query_context: QueryContext,
    dataset: Arc<dyn Dataset>,
    active_graph: ActiveGraph,
    named_graphs: Option<Arc<[NamedNode]>>,
    functions: Arc<FunctionRegistry>,
    dispatcher: Arc<dyn PlanDispatcher>,
    path_evaluator: Arc<dyn PropertyPathEvaluator>,
}

impl ExecutionContext {
    pub fn new(
        query_context: QueryContext,
        dataset: Arc<dyn Dataset>,
        functions: Arc<FunctionRegistry>,
        dispatcher: Arc<dyn PlanDispatcher>,
        path_evaluator: Arc<dyn PropertyPathEvaluator>,
    ) -> Self {
        Self {
            query_context,
            dataset,
            active_graph: ActiveGraph::Default,
            named_graphs: None,
            functions,
            dispatcher,
            path_evaluator,
        }
    }

    #[must_use]
    pub fn with_active_graph(&self, active_graph: ActiveGraph) -> Self {
        Self {
            active_graph,
            ..self.clone()
        }
    }

    /// Restricts the graphs visible to `GRAPH ?g` to `named_graphs` (`FROM NAMED`).
    #[must_use]
    pub fn with_named_graphs(&self, named_graphs: Option<Vec<NamedNode>>) -> Self {
        Self {
            named_graphs: named_graphs.map(Arc::from),
            ..self.clone()
        }
    }

    /// Applies a `FROM`/`FROM NAMED` (or `USING`) clause.
    ///
    /// The default graph becomes the merge of the `FROM` graphs, which is empty if only
    /// `FROM NAMED` is given.
    #[must_use]
    pub fn with_query_dataset(&self, dataset: Option<&QueryDataset>) -> Self {
        match dataset {
            Some(dataset) => self
                .with_active_graph(ActiveGraph::Union(dataset.default.clone()))
                .with_named_graphs(dataset.named.clone()),
            None => self.clone(),
        }
    }

    #[must_use]
    pub fn with_hints(&self, hints: QueryHints) -> Self {
        Self {
            query_context: self.query_context.clone().with_hints(hints),
            ..self.clone()
        }
    }

    pub fn engine(&self) -> PipelineEngine {
        self.query_context.engine()
    }

    pub fn query_context(&self) -> &QueryContext {
        &self.query_context
    }

    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        &self.dataset
    }

    pub fn active_graph(&self) -> &ActiveGraph {
        &self.active_graph
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn path_evaluator(&self) -> &Arc<dyn PropertyPathEvaluator> {
        &self.path_evaluator
    }

    /// The named graphs that `GRAPH ?g` iterates over.
    ///
    /// These are the `FROM NAMED` graphs that exist in the dataset or, without a `FROM NAMED`
    /// clause, all named graphs of the dataset.
    pub fn named_graphs(&self) -> Vec<NamedNode> {
        match &self.named_graphs {
            Some(iris) => iris
                .iter()
                .filter(|iri| self.dataset.has_named_graph(iri))
                .cloned()
                .collect(),
            None => self.dataset.named_graph_iris(),
        }
    }

    /// Returns whether `iri` may be used as the name of a named graph in this evaluation.
    pub fn is_visible_named_graph(&self, iri: &NamedNode) -> bool {
        self.named_graphs
            .as_ref()
            .map_or(true, |iris| iris.contains(iri))
            && self.dataset.has_named_graph(iri)
    }

    /// Builds the plan for `pattern` through the [PlanDispatcher].
    pub fn build_plan(
        &self,
        pattern: &GraphPattern,
        source: PipelineStage<Bindings>,
    ) -> Result<PipelineStage<Bindings>, QueryEvaluationError> {
        self.dispatcher.build_plan(pattern, self, source)
    }

    /// Like [Self::build_plan] but reports construction errors as a failing stage.
    ///
    /// Used for sub-plans that are built while the pipeline is already running.
    pub fn plan_or_fail(
        &self,
        pattern: &GraphPattern,
        source: PipelineStage<Bindings>,
    ) -> PipelineStage<Bindings> {
        self.build_plan(pattern, source)
            .unwrap_or_else(|error| self.engine().error(error))
    }

    /// Builds `pattern` once without any input to report construction errors eagerly.
    pub fn validate_plan(&self, pattern: &GraphPattern) -> Result<(), QueryEvaluationError> {
        self.build_plan(pattern, self.engine().empty()).map(drop)
    }

    /// Resolves the active graph if it does not depend on the bindings.
    ///
    /// Returns [None] for [ActiveGraph::Bound].
    pub fn resolve_static_graph(&self) -> Result<Option<Arc<dyn Graph>>, QueryEvaluationError> {
        Ok(match &self.active_graph {
            ActiveGraph::Default => Some(self.dataset.default_graph()),
            ActiveGraph::Named(iri) => Some(
                self.dataset
                    .named_graph(iri)
                    .ok_or_else(|| QueryEvaluationError::GraphDoesNotExist(iri.clone()))?,
            ),
            ActiveGraph::Union(iris) => {
                let existing = iris
                    .iter()
                    .filter(|iri| self.dataset.has_named_graph(iri))
                    .cloned()
                    .collect::<Vec<_>>();
                Some(self.dataset.union_graph(&existing, false)?)
            }
            ActiveGraph::Bound(_) => None,
        })
    }

    /// Evaluates `evaluate` against the active graph.
    ///
    /// For a static active graph, `evaluate` is called once with the whole `source`. For
    /// [ActiveGraph::Bound], the graph is resolved for every binding. A binding that leaves the
    /// graph variable unbound is evaluated against every visible named graph, extended with the
    /// graph's IRI. Unknown graphs produce no solutions.
    pub fn on_active_graph<F>(
        &self,
        source: PipelineStage<Bindings>,
        evaluate: F,
    ) -> Result<PipelineStage<Bindings>, QueryEvaluationError>
    where
        F: Fn(PipelineStage<Bindings>, Arc<dyn Graph>) -> PipelineStage<Bindings>
            + Send
            + Sync
            + 'static,
    {
        if let Some(graph) = self.resolve_static_graph()? {
            return Ok(evaluate(source, graph));
        }
        let ActiveGraph::Bound(variable) = self.active_graph.clone() else {
            return QueryEvaluationError::internal(format!(
                "The active graph {:?} could not be resolved",
                self.active_graph
            ));
        };

        let engine = self.engine();
        let context = self.clone();
        Ok(engine.merge_map(source, move |bindings| {
            let iri = match bindings.get(&variable) {
                Some(Term::NamedNode(iri)) => Some(iri.clone()),
                Some(_) => return engine.empty(),
                None => None,
            };
            if let Some(iri) = iri {
                return match context.visible_named_graph(&iri) {
                    Some(graph) => evaluate(engine.of(vec![bindings]), graph),
                    None => engine.empty(),
                };
            }

            let stages = context
                .named_graphs()
                .into_iter()
                .filter_map(|iri| {
                    let graph = context.dataset.named_graph(&iri)?;
                    let extended = bindings.extended(variable.clone(), iri.into());
                    Some(evaluate(engine.of(vec![extended]), graph))
                })
                .collect();
            engine.merge(stages)
        }))
    }

    fn visible_named_graph(&self, iri: &NamedNode) -> Option<Arc<dyn Graph>> {
        if self.is_visible_named_graph(iri) {
            self.dataset.named_graph(iri)
        } else {
            None
        }
    }
}

impl Debug for ExecutionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("query_context", &self.query_context)
            .field("active_graph", &self.active_graph)
            .field("named_graphs", &self.named_graphs)
            .field("functions", &self.functions.names())
            .finish_non_exhaustive()
    }
}
