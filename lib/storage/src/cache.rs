use dashmap::DashMap;
use rdf_pipeline_model::{Bindings, NamedNode, TriplePattern};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    graph: String,
    bgp: String,
}

impl CacheKey {
    fn new(graph: &NamedNode, bgp: &[TriplePattern]) -> Self {
        let bgp = bgp
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" . ");
        Self {
            graph: graph.as_str().to_owned(),
            bgp,
        }
    }
}

/// Caches the results of basic graph patterns that do not depend on any incoming binding.
///
/// The cache is shared between queries. Entries are never invalidated by updates, so it must only
/// be enabled for read-only workloads.
#[derive(Debug)]
pub struct BgpCache {
    capacity: usize,
    entries: DashMap<CacheKey, Arc<Vec<Bindings>>>,
}

impl BgpCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, graph: &NamedNode, bgp: &[TriplePattern]) -> Option<Arc<Vec<Bindings>>> {
        self.entries
            .get(&CacheKey::new(graph, bgp))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Stores the solutions of `bgp`. If the cache is full, an arbitrary entry is evicted.
    pub fn insert(&self, graph: &NamedNode, bgp: &[TriplePattern], solutions: Vec<Bindings>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            let evicted = self.entries.iter().next().map(|entry| entry.key().clone());
            if let Some(evicted) = evicted {
                debug!(graph = %evicted.graph, "Evicting cached basic graph pattern");
                self.entries.remove(&evicted);
            }
        }
        self.entries
            .insert(CacheKey::new(graph, bgp), Arc::new(solutions));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
