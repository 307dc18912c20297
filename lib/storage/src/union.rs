use crate::{Graph, GraphCapabilities, QueryContext};
use async_trait::async_trait;
use futures::future::try_join_all;
use rdf_pipeline_common::{Pipeline, PipelineStage, StorageError};
use rdf_pipeline_model::{NamedNode, Triple, TriplePattern};
use std::sync::Arc;

pub const UNION_GRAPH_IRI: &str = "urn:rdf-pipeline:union-graph";

/// A read view over the union of several graphs.
///
/// Inserts go to the first member. Deletes and clears are applied to every member.
#[derive(Debug, Clone)]
pub struct UnionGraph {
    iri: NamedNode,
    graphs: Vec<Arc<dyn Graph>>,
}

impl UnionGraph {
    pub fn new(graphs: Vec<Arc<dyn Graph>>) -> Self {
        Self {
            iri: NamedNode::new_unchecked(UNION_GRAPH_IRI),
            graphs,
        }
    }

    pub fn graphs(&self) -> &[Arc<dyn Graph>] {
        &self.graphs
    }
}

#[async_trait]
impl Graph for UnionGraph {
    fn iri(&self) -> &NamedNode {
        &self.iri
    }

    fn capabilities(&self) -> GraphCapabilities {
        let all_estimate = !self.graphs.is_empty()
            && self.graphs.iter().all(|graph| {
                graph
                    .capabilities()
                    .contains(GraphCapabilities::ESTIMATE_CARDINALITY)
            });
        if all_estimate {
            GraphCapabilities::ESTIMATE_CARDINALITY
        } else {
            GraphCapabilities::NONE
        }
    }

    async fn insert(&self, triple: Triple) -> Result<bool, StorageError> {
        match self.graphs.first() {
            Some(graph) => graph.insert(triple).await,
            None => Err(StorageError::Unsupported(
                self.iri.clone(),
                "inserting into an empty union",
            )),
        }
    }

    async fn delete(&self, triple: &Triple) -> Result<bool, StorageError> {
        let deleted = try_join_all(self.graphs.iter().map(|graph| graph.delete(triple))).await?;
        Ok(deleted.into_iter().any(|deleted| deleted))
    }

    async fn clear(&self) -> Result<(), StorageError> {
        try_join_all(self.graphs.iter().map(|graph| graph.clear())).await?;
        Ok(())
    }

    fn find(&self, pattern: &TriplePattern, context: &QueryContext) -> PipelineStage<Triple> {
        let engine = context.engine();
        let stages = self
            .graphs
            .iter()
            .map(|graph| graph.find(pattern, context))
            .collect();
        engine.distinct(engine.merge(stages), Triple::clone)
    }

    async fn estimate_cardinality(&self, pattern: &TriplePattern) -> Result<u64, StorageError> {
        let estimates = try_join_all(
            self.graphs
                .iter()
                .map(|graph| graph.estimate_cardinality(pattern)),
        )
        .await?;
        Ok(estimates.into_iter().fold(0, u64::saturating_add))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryGraph;

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{value}"))
    }

    #[tokio::test]
    async fn routes_updates_and_deduplicates_reads() {
        let first = Arc::new(MemoryGraph::new(iri("g1")));
        let second = Arc::new(MemoryGraph::new(iri("g2")));
        let shared = Triple::new(iri("s"), iri("p"), iri("o"));
        second.insert(shared.clone()).await.unwrap();
        let members: Vec<Arc<dyn Graph>> = vec![first.clone(), second.clone()];
        let union = UnionGraph::new(members);

        union.insert(shared.clone()).await.unwrap();
        assert!(first.contains(&shared).await);

        let pattern = TriplePattern {
            subject: iri("s").into(),
            predicate: iri("p").into(),
            object: rdf_pipeline_model::Variable::new_unchecked("o").into(),
        };
        let found = union
            .find(&pattern, &QueryContext::default())
            .collect_vec()
            .await
            .unwrap();
        assert_eq!(found, vec![shared.clone()]);
        assert_eq!(union.estimate_cardinality(&pattern).await.unwrap(), 2);

        assert!(union.delete(&shared).await.unwrap());
        assert!(first.is_empty().await);
        assert!(second.is_empty().await);
    }

    #[test]
    fn estimation_requires_every_member() {
        let capable: Arc<dyn Graph> = Arc::new(MemoryGraph::new(iri("g1")));
        let incapable: Arc<dyn Graph> =
            Arc::new(MemoryGraph::new(iri("g2")).with_capabilities(GraphCapabilities::NONE));

        assert_eq!(
            UnionGraph::new(vec![Arc::clone(&capable)]).capabilities(),
            GraphCapabilities::ESTIMATE_CARDINALITY
        );
        assert_eq!(
            UnionGraph::new(vec![capable, incapable]).capabilities(),
            GraphCapabilities::NONE
        );
    }
}
