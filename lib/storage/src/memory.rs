use crate::pattern::{extract_bindings, pattern_to_triple, triple_matches};
use crate::{Graph, GraphCapabilities, QueryContext};
use async_trait::async_trait;
use rdf_pipeline_common::{Pipeline, PipelineStage, StorageError};
use rdf_pipeline_model::{NamedNode, Triple, TriplePattern};
use rustc_hash::FxHashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The triples of a [MemoryGraph] in insertion order.
#[derive(Default)]
struct Content {
    triples: Vec<Triple>,
    index: FxHashSet<Triple>,
}

/// A graph that keeps its triples in memory.
///
/// The capabilities can be configured to emulate less capable backends, which is useful for
/// testing the fallbacks of the engine.
///
/// ```
/// # use rdf_pipeline_storage::{Graph, GraphCapabilities, MemoryGraph};
/// # use rdf_pipeline_model::{NamedNode, Triple};
/// # tokio_test::block_on(async {
/// let ex = NamedNode::new("http://example.com")?;
/// let graph = MemoryGraph::new(ex.clone()).with_capabilities(GraphCapabilities::ALL);
///
/// assert!(graph.insert(Triple::new(ex.clone(), ex.clone(), ex.clone())).await?);
/// assert_eq!(graph.len().await, 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # }).unwrap();
/// ```
pub struct MemoryGraph {
    iri: NamedNode,
    capabilities: GraphCapabilities,
    content: Arc<RwLock<Content>>,
}

impl MemoryGraph {
    /// Creates an empty graph that supports cardinality estimation.
    pub fn new(iri: NamedNode) -> Self {
        Self {
            iri,
            capabilities: GraphCapabilities::ESTIMATE_CARDINALITY,
            content: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: GraphCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub async fn len(&self) -> usize {
        self.content.read().await.triples.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.content.read().await.triples.is_empty()
    }

    pub async fn contains(&self, triple: &Triple) -> bool {
        self.content.read().await.index.contains(triple)
    }

    /// Returns a snapshot of all triples in insertion order.
    pub async fn triples(&self) -> Vec<Triple> {
        self.content.read().await.triples.clone()
    }
}

impl Debug for MemoryGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGraph")
            .field("iri", &self.iri)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Graph for MemoryGraph {
    fn iri(&self) -> &NamedNode {
        &self.iri
    }

    fn capabilities(&self) -> GraphCapabilities {
        self.capabilities
    }

    async fn insert(&self, triple: Triple) -> Result<bool, StorageError> {
        let mut content = self.content.write().await;
        if !content.index.insert(triple.clone()) {
            return Ok(false);
        }
        content.triples.push(triple);
        Ok(true)
    }

    async fn delete(&self, triple: &Triple) -> Result<bool, StorageError> {
        let mut content = self.content.write().await;
        if !content.index.remove(triple) {
            return Ok(false);
        }
        content.triples.retain(|candidate| candidate != triple);
        Ok(true)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut content = self.content.write().await;
        content.triples.clear();
        content.index.clear();
        Ok(())
    }

    fn find(&self, pattern: &TriplePattern, context: &QueryContext) -> PipelineStage<Triple> {
        let engine = context.engine();
        let content = Arc::clone(&self.content);
        let pattern = pattern.clone();
        let matches = engine.from_future(async move {
            let content = content.read().await;
            if let Some(triple) = pattern_to_triple(&pattern) {
                return Ok(content.index.get(&triple).cloned().into_iter().collect());
            }
            Ok(content
                .triples
                .iter()
                .filter(|triple| triple_matches(&pattern, triple))
                .cloned()
                .collect::<Vec<_>>())
        });
        engine.merge_map(matches, move |triples| engine.of(triples))
    }

    async fn estimate_cardinality(&self, pattern: &TriplePattern) -> Result<u64, StorageError> {
        if !self
            .capabilities
            .contains(GraphCapabilities::ESTIMATE_CARDINALITY)
        {
            return Err(StorageError::Unsupported(
                self.iri.clone(),
                "cardinality estimation",
            ));
        }
        let content = self.content.read().await;
        let count = content
            .triples
            .iter()
            .filter(|triple| extract_bindings(pattern, triple).is_some())
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_model::{Literal, Variable};

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{value}"))
    }

    #[tokio::test]
    async fn insert_and_delete_report_changes() {
        let graph = MemoryGraph::new(iri("g"));
        let triple = Triple::new(iri("s"), iri("p"), Literal::from("o"));

        assert!(graph.insert(triple.clone()).await.unwrap());
        assert!(!graph.insert(triple.clone()).await.unwrap());
        assert!(graph.delete(&triple).await.unwrap());
        assert!(!graph.delete(&triple).await.unwrap());
        assert!(graph.is_empty().await);
    }

    #[tokio::test]
    async fn find_matches_pattern() {
        let graph = MemoryGraph::new(iri("g"));
        graph
            .insert(Triple::new(iri("a"), iri("p"), iri("b")))
            .await
            .unwrap();
        graph
            .insert(Triple::new(iri("a"), iri("q"), iri("c")))
            .await
            .unwrap();
        let pattern = TriplePattern {
            subject: iri("a").into(),
            predicate: iri("p").into(),
            object: Variable::new_unchecked("o").into(),
        };

        let found = graph
            .find(&pattern, &QueryContext::default())
            .collect_vec()
            .await
            .unwrap();

        assert_eq!(found, vec![Triple::new(iri("a"), iri("p"), iri("b"))]);
        assert_eq!(graph.estimate_cardinality(&pattern).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn estimation_requires_capability() {
        let graph = MemoryGraph::new(iri("g")).with_capabilities(GraphCapabilities::NONE);
        let pattern = TriplePattern {
            subject: Variable::new_unchecked("s").into(),
            predicate: iri("p").into(),
            object: Variable::new_unchecked("o").into(),
        };

        assert!(graph.estimate_cardinality(&pattern).await.is_err());
    }
}
