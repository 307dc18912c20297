use crate::{Graph, MemoryGraph, UnionGraph};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rdf_pipeline_common::QueryEvaluationError;
use rdf_pipeline_model::NamedNode;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub const DEFAULT_GRAPH_IRI: &str = "urn:rdf-pipeline:default-graph";

/// Creates the graph for a newly created named graph.
pub type GraphFactory = Arc<dyn Fn(NamedNode) -> Arc<dyn Graph> + Send + Sync>;

/// A default graph and a set of named graphs.
pub trait Dataset: Debug + Send + Sync + 'static {
    fn default_graph(&self) -> Arc<dyn Graph>;

    fn named_graph(&self, iri: &NamedNode) -> Option<Arc<dyn Graph>>;

    fn has_named_graph(&self, iri: &NamedNode) -> bool {
        self.named_graph(iri).is_some()
    }

    /// The IRIs of all named graphs in lexicographic order.
    fn named_graph_iris(&self) -> Vec<NamedNode>;

    /// Adds `graph` under its own IRI. Returns false if a graph with that IRI already exists.
    fn add_named_graph(&self, graph: Arc<dyn Graph>) -> bool;

    fn remove_named_graph(&self, iri: &NamedNode) -> Option<Arc<dyn Graph>>;

    /// Creates a new, empty named graph.
    fn create_graph(&self, iri: NamedNode) -> Result<Arc<dyn Graph>, QueryEvaluationError>;

    /// Returns the union of the given named graphs and, optionally, the default graph.
    fn union_graph(
        &self,
        iris: &[NamedNode],
        include_default: bool,
    ) -> Result<Arc<dyn Graph>, QueryEvaluationError> {
        let mut graphs = Vec::with_capacity(iris.len() + 1);
        if include_default {
            graphs.push(self.default_graph());
        }
        for iri in iris {
            let graph = self
                .named_graph(iri)
                .ok_or_else(|| QueryEvaluationError::GraphDoesNotExist(iri.clone()))?;
            graphs.push(graph);
        }
        Ok(Arc::new(UnionGraph::new(graphs)))
    }

    /// Returns the union of all named graphs and, optionally, the default graph.
    fn all_graphs(&self, include_default: bool) -> Arc<dyn Graph> {
        let mut graphs = Vec::new();
        if include_default {
            graphs.push(self.default_graph());
        }
        graphs.extend(
            self.named_graph_iris()
                .iter()
                .filter_map(|iri| self.named_graph(iri)),
        );
        Arc::new(UnionGraph::new(graphs))
    }
}

/// A [Dataset] that keeps its named graphs in a concurrent hash map.
pub struct HashMapDataset {
    default_graph: Arc<dyn Graph>,
    named_graphs: DashMap<NamedNode, Arc<dyn Graph>>,
    factory: GraphFactory,
}

impl HashMapDataset {
    /// Creates a dataset whose graphs are [MemoryGraph]s.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(|iri| -> Arc<dyn Graph> {
            Arc::new(MemoryGraph::new(iri))
        }))
    }

    pub fn with_factory(factory: GraphFactory) -> Self {
        Self {
            default_graph: factory(NamedNode::new_unchecked(DEFAULT_GRAPH_IRI)),
            named_graphs: DashMap::new(),
            factory,
        }
    }

    #[must_use]
    pub fn with_default_graph(mut self, graph: Arc<dyn Graph>) -> Self {
        self.default_graph = graph;
        self
    }
}

impl Default for HashMapDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for HashMapDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashMapDataset")
            .field("default_graph", &self.default_graph)
            .field("named_graphs", &self.named_graph_iris())
            .finish_non_exhaustive()
    }
}

impl Dataset for HashMapDataset {
    fn default_graph(&self) -> Arc<dyn Graph> {
        Arc::clone(&self.default_graph)
    }

    fn named_graph(&self, iri: &NamedNode) -> Option<Arc<dyn Graph>> {
        self.named_graphs
            .get(iri)
            .map(|graph| Arc::clone(graph.value()))
    }

    fn named_graph_iris(&self) -> Vec<NamedNode> {
        let mut iris = self
            .named_graphs
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        iris.sort_unstable_by(|lhs, rhs| lhs.as_str().cmp(rhs.as_str()));
        iris
    }

    fn add_named_graph(&self, graph: Arc<dyn Graph>) -> bool {
        match self.named_graphs.entry(graph.iri().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(graph);
                true
            }
        }
    }

    fn remove_named_graph(&self, iri: &NamedNode) -> Option<Arc<dyn Graph>> {
        self.named_graphs.remove(iri).map(|(_, graph)| graph)
    }

    fn create_graph(&self, iri: NamedNode) -> Result<Arc<dyn Graph>, QueryEvaluationError> {
        match self.named_graphs.entry(iri.clone()) {
            Entry::Occupied(_) => Err(QueryEvaluationError::GraphAlreadyExists(iri)),
            Entry::Vacant(entry) => {
                let graph = (self.factory)(iri);
                entry.insert(Arc::clone(&graph));
                Ok(graph)
            }
        }
    }
}
