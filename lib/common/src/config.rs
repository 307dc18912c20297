/// Defines how the patterns of a basic graph pattern are ordered if the graph cannot estimate
/// cardinalities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinOrdering {
    /// Patterns are evaluated in the order they appear in the query.
    AsWritten,
    /// Patterns are ordered by the shape of their bound slots. Patterns that share a variable with
    /// already placed patterns are preferred.
    #[default]
    Structural,
}

/// Defines which realization of the pipeline engine evaluates a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineKind {
    /// Items are produced lazily when the consumer asks for them.
    #[default]
    Streaming,
    /// Every operator materializes its entire input before producing output.
    Vectorized,
}

/// Tuning knobs for a single query evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryHints {
    /// The maximum number of bindings that are joined in a single bound join round-trip.
    pub bound_join_batch_size: usize,
    /// The join ordering that is used if a graph cannot estimate cardinalities.
    pub join_ordering: JoinOrdering,
    /// Whether results of unbound basic graph patterns may be served from the cache.
    pub use_cache: bool,
}

impl QueryHints {
    pub const DEFAULT_BOUND_JOIN_BATCH_SIZE: usize = 15;

    #[must_use]
    pub fn with_bound_join_batch_size(mut self, size: usize) -> Self {
        self.bound_join_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_join_ordering(mut self, join_ordering: JoinOrdering) -> Self {
        self.join_ordering = join_ordering;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

impl Default for QueryHints {
    fn default() -> Self {
        Self {
            bound_join_batch_size: Self::DEFAULT_BOUND_JOIN_BATCH_SIZE,
            join_ordering: JoinOrdering::default(),
            use_cache: false,
        }
    }
}

/// Session-wide configuration of the engine. Selected once when the session is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// The pipeline realization.
    pub pipeline: PipelineKind,
    /// The default hints for every query.
    pub hints: QueryHints,
    /// The number of basic graph pattern results that are kept in the cache. Zero disables
    /// caching.
    pub cache_capacity: usize,
}

impl EngineConfig {
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineKind) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints: QueryHints) -> Self {
        self.hints = hints;
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineKind::default(),
            hints: QueryHints::default(),
            cache_capacity: 0,
        }
    }
}
