use crate::bgp::evaluate_bgp;
use crate::search::{default_full_text_search, FullTextSearchQuery, ScoredTriple};
use crate::QueryContext;
use async_trait::async_trait;
use rdf_pipeline_common::{Pipeline, PipelineStage, QueryEvaluationError, StorageError};
use rdf_pipeline_model::{Bindings, NamedNode, Triple, TriplePattern};
use std::fmt::{Debug, Display, Formatter};
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

/// The optional capabilities of a [Graph].
///
/// Every graph declares its capabilities explicitly. The engine never probes for optional
/// methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GraphCapabilities(u8);

impl GraphCapabilities {
    /// Only the required operations are supported.
    pub const NONE: Self = Self(0);
    /// [Graph::estimate_cardinality] returns an estimate.
    pub const ESTIMATE_CARDINALITY: Self = Self(1);
    /// [Graph::eval_union] evaluates several basic graph patterns in a single round-trip.
    pub const EVALUATE_UNION: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::ESTIMATE_CARDINALITY.0 | Self::EVALUATE_UNION.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for GraphCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for GraphCapabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Display for GraphCapabilities {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::ESTIMATE_CARDINALITY) {
            names.push("estimate-cardinality");
        }
        if self.contains(Self::EVALUATE_UNION) {
            names.push("evaluate-union");
        }
        write!(f, "[{}]", names.join(", "))
    }
}

/// An RDF graph that the engine can evaluate queries against.
///
/// Implementations must provide the required operations ([Graph::insert], [Graph::delete],
/// [Graph::clear], and [Graph::find]). The remaining operations have default implementations that
/// are built on [Graph::find]. Graphs that can do better declare this with
/// [Graph::capabilities] and override the corresponding method.
#[async_trait]
pub trait Graph: Debug + Send + Sync + 'static {
    /// The IRI that identifies this graph.
    fn iri(&self) -> &NamedNode;

    /// The optional operations this graph supports.
    fn capabilities(&self) -> GraphCapabilities {
        GraphCapabilities::NONE
    }

    /// Inserts a triple. Returns whether the triple was not present before.
    async fn insert(&self, triple: Triple) -> Result<bool, StorageError>;

    /// Deletes a triple. Returns whether the triple was present.
    async fn delete(&self, triple: &Triple) -> Result<bool, StorageError>;

    /// Removes all triples.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Returns all triples that match `pattern`.
    ///
    /// Blank nodes in the pattern are treated like IRIs, i.e., they only match themselves.
    fn find(&self, pattern: &TriplePattern, context: &QueryContext) -> PipelineStage<Triple>;

    /// Estimates the number of triples matching `pattern`.
    ///
    /// Only available if the graph has [GraphCapabilities::ESTIMATE_CARDINALITY].
    async fn estimate_cardinality(&self, _pattern: &TriplePattern) -> Result<u64, StorageError> {
        Err(StorageError::Unsupported(
            self.iri().clone(),
            "cardinality estimation",
        ))
    }

    /// Evaluates a basic graph pattern.
    fn eval_bgp(
        self: Arc<Self>,
        bgp: Vec<TriplePattern>,
        context: &QueryContext,
    ) -> PipelineStage<Bindings> {
        evaluate_bgp(self, bgp, context)
    }

    /// Evaluates the union of several basic graph patterns.
    ///
    /// The default implementation merges the results of [Graph::eval_bgp]. Graphs with
    /// [GraphCapabilities::EVALUATE_UNION] evaluate all patterns in a single round-trip.
    fn eval_union(
        self: Arc<Self>,
        bgps: Vec<Vec<TriplePattern>>,
        context: &QueryContext,
    ) -> PipelineStage<Bindings> {
        let stages = bgps
            .into_iter()
            .map(|bgp| evaluate_bgp(Arc::clone(&self), bgp, context))
            .collect();
        context.engine().merge(stages)
    }

    /// Runs a keyword search over the terms matched by a triple pattern.
    ///
    /// Invalid queries (e.g., a minimum relevance above the maximum relevance) are rejected
    /// before any work is done.
    fn full_text_search(
        self: Arc<Self>,
        query: FullTextSearchQuery,
        context: &QueryContext,
    ) -> Result<PipelineStage<ScoredTriple>, QueryEvaluationError> {
        default_full_text_search(self, query, context)
    }
}
