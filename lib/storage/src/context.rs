use crate::cache::BgpCache;
use rdf_pipeline_common::{PipelineEngine, QueryHints};
use std::sync::Arc;

/// The storage-facing part of an evaluation context.
///
/// It is cheap to clone and handed to every [Graph](crate::Graph) operation.
#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    engine: PipelineEngine,
    hints: QueryHints,
    cache: Option<Arc<BgpCache>>,
}

impl QueryContext {
    pub fn new(engine: PipelineEngine, hints: QueryHints) -> Self {
        Self {
            engine,
            hints,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Option<Arc<BgpCache>>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_hints(mut self, hints: QueryHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn engine(&self) -> PipelineEngine {
        self.engine
    }

    pub fn hints(&self) -> &QueryHints {
        &self.hints
    }

    /// Returns the cache if the hints allow its use.
    pub fn cache(&self) -> Option<&Arc<BgpCache>> {
        self.cache.as_ref().filter(|_| self.hints.use_cache)
    }
}
