//! API to query and update an [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).
//!
//! The entry point of the module is the [`Store`] struct.
//!
//! Usage example:
//! ```
//! use rdf_pipeline::model::*;
//! use rdf_pipeline::sparql::QueryResults;
//! use rdf_pipeline::store::Store;
//! use futures::StreamExt;
//!
//! # tokio_test::block_on(async {
//! let store = Store::new();
//!
//! // insertion
//! let ex = NamedNode::new("http://example.com")?;
//! let triple = Triple::new(ex.clone(), ex.clone(), ex.clone());
//! store.insert(triple.clone()).await?;
//! assert!(store.contains(&triple).await?);
//!
//! // SPARQL query
//! if let QueryResults::Solutions(mut solutions) = store.query("SELECT ?s WHERE { ?s ?p ?o }").await? {
//!     assert_eq!(solutions.next().await.unwrap()?.get("s"), Some(&ex.into()));
//! };
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! # }).unwrap();
//! ```

use rdf_pipeline_common::{EngineConfig, Pipeline, QueryEvaluationError, StorageError};
use rdf_pipeline_execution::sparql::{
    evaluate_query, Query, QueryOptions, QueryResults, Update, UpdateOptions,
};
use rdf_pipeline_execution::update::{execute_update, UpdateOperation};
use rdf_pipeline_execution::{ExecutionContext, PlanBuilder, TraversalPathEvaluator};
use rdf_pipeline_functions::FunctionRegistry;
use rdf_pipeline_model::{NamedNode, Triple};
use rdf_pipeline_storage::pattern::triple_to_pattern;
use rdf_pipeline_storage::{BgpCache, Dataset, HashMapDataset, QueryContext};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

/// An [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) together with the
/// engine that evaluates [SPARQL](https://www.w3.org/TR/sparql11-query) against it.
///
/// Cloning a store is cheap. Clones share the dataset, the custom functions, and the cache.
///
/// Usage example:
/// ```
/// use rdf_pipeline::model::*;
/// use rdf_pipeline::store::Store;
///
/// # tokio_test::block_on(async {
/// let store = Store::new();
/// store
///     .update("INSERT DATA { <http://example.com/s> <http://example.com/p> \"o\" }")
///     .await?;
///
/// let triple = Triple::new(
///     NamedNode::new("http://example.com/s")?,
///     NamedNode::new("http://example.com/p")?,
///     Literal::from("o"),
/// );
/// assert!(store.contains(&triple).await?);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Store {
    dataset: Arc<dyn Dataset>,
    config: EngineConfig,
    functions: Arc<FunctionRegistry>,
    cache: Option<Arc<BgpCache>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates a [Store] with an in-memory [HashMapDataset] and the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates a [Store] with an in-memory [HashMapDataset] using the given `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_dataset(Arc::new(HashMapDataset::new()), config)
    }

    /// Creates a [Store] that evaluates queries against `dataset`.
    ///
    /// A `config` with a non-zero cache capacity enables the cache for basic graph patterns. The
    /// cache is cleared whenever the dataset is changed through this store.
    pub fn with_dataset(dataset: Arc<dyn Dataset>, config: EngineConfig) -> Self {
        let cache = (config.cache_capacity > 0)
            .then(|| Arc::new(BgpCache::new(config.cache_capacity)));
        Self {
            dataset,
            config,
            functions: Arc::new(FunctionRegistry::new()),
            cache,
        }
    }

    /// Makes the custom functions of `functions` available to queries and updates.
    ///
    /// Usage example:
    /// ```
    /// use rdf_pipeline::functions::{EvaluatedValue, FunctionRegistry};
    /// use rdf_pipeline::model::*;
    /// use rdf_pipeline::sparql::QueryResults;
    /// use rdf_pipeline::store::Store;
    /// use futures::StreamExt;
    ///
    /// # tokio_test::block_on(async {
    /// let mut functions = FunctionRegistry::new();
    /// functions.register_fn(NamedNode::new("http://example.com/answer")?, |_| {
    ///     Ok(EvaluatedValue::Term(Literal::from(42).into()))
    /// });
    /// let store = Store::new().with_functions(functions);
    ///
    /// if let QueryResults::Solutions(mut solutions) = store
    ///     .query("SELECT (<http://example.com/answer>() AS ?a) WHERE {}")
    ///     .await?
    /// {
    ///     assert_eq!(
    ///         solutions.next().await.unwrap()?.get("a"),
    ///         Some(&Literal::from(42).into())
    ///     );
    /// }
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    #[must_use]
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Arc::new(functions);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        &self.dataset
    }

    /// Returns the [ExecutionContext] that queries of this store are evaluated in.
    pub fn context(&self) -> ExecutionContext {
        let query_context = QueryContext::new(self.config.pipeline.into(), self.config.hints)
            .with_cache(self.cache.clone());
        ExecutionContext::new(
            query_context,
            Arc::clone(&self.dataset),
            Arc::clone(&self.functions),
            Arc::new(PlanBuilder),
            Arc::new(TraversalPathEvaluator),
        )
    }

    /// Executes a [SPARQL](https://www.w3.org/TR/sparql11-query/) query.
    ///
    /// Usage example:
    /// ```
    /// use rdf_pipeline::model::*;
    /// use rdf_pipeline::sparql::QueryResults;
    /// use rdf_pipeline::store::Store;
    /// use futures::StreamExt;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::new();
    ///
    /// // insertions
    /// let ex = NamedNode::new("http://example.com")?;
    /// store.insert(Triple::new(ex.clone(), ex.clone(), ex.clone())).await?;
    ///
    /// // SPARQL query
    /// if let QueryResults::Solutions(mut solutions) = store.query("SELECT ?s WHERE { ?s ?p ?o }").await? {
    ///     assert_eq!(solutions.next().await.unwrap()?.get("s"), Some(&ex.into()));
    /// }
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub async fn query(
        &self,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError> + Debug>,
    ) -> Result<QueryResults, QueryEvaluationError> {
        self.query_opt(query, QueryOptions::default()).await
    }

    /// Executes a [SPARQL](https://www.w3.org/TR/sparql11-query/) query with some options.
    ///
    /// Usage example limiting the bound join batches:
    /// ```
    /// use rdf_pipeline::common::QueryHints;
    /// use rdf_pipeline::sparql::{QueryOptions, QueryResults};
    /// use rdf_pipeline::store::Store;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::new();
    /// let options = QueryOptions::default()
    ///     .with_hints(QueryHints::default().with_bound_join_batch_size(16));
    /// if let QueryResults::Boolean(found) = store.query_opt("ASK { ?s ?p ?o }", options).await? {
    ///     assert!(!found);
    /// }
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub async fn query_opt(
        &self,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError> + Debug>,
        options: QueryOptions,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let query = query
            .try_into()
            .map_err(Into::<QueryEvaluationError>::into)?;
        evaluate_query(&query, &self.context(), options).await
    }

    /// Executes a [SPARQL 1.1 update](https://www.w3.org/TR/sparql11-update/).
    ///
    /// Usage example:
    /// ```
    /// use rdf_pipeline::model::*;
    /// use rdf_pipeline::store::Store;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::new();
    ///
    /// // insertion
    /// store
    ///     .update("INSERT DATA { <http://example.com> <http://example.com> <http://example.com> }")
    ///     .await?;
    ///
    /// // we inspect the store contents
    /// let ex = NamedNode::new("http://example.com")?;
    /// assert!(store.contains(&Triple::new(ex.clone(), ex.clone(), ex)).await?);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub async fn update(
        &self,
        update: impl TryInto<Update, Error = impl Into<QueryEvaluationError>>,
    ) -> Result<(), QueryEvaluationError> {
        self.update_opt(update, UpdateOptions::default()).await
    }

    /// Executes a [SPARQL 1.1 update](https://www.w3.org/TR/sparql11-update/) with some options.
    pub async fn update_opt(
        &self,
        update: impl TryInto<Update, Error = impl Into<QueryEvaluationError>>,
        options: impl Into<UpdateOptions>,
    ) -> Result<(), QueryEvaluationError> {
        let update = update
            .try_into()
            .map_err(Into::<QueryEvaluationError>::into)?;
        let operations = update
            .operations
            .into_iter()
            .map(UpdateOperation::from)
            .collect::<Vec<_>>();
        self.execute_update(&operations, options).await
    }

    /// Executes already parsed update operations.
    ///
    /// In contrast to [Store::update], this allows issuing `ADD`, `COPY`, and `MOVE` directly.
    ///
    /// Usage example:
    /// ```
    /// use rdf_pipeline::model::algebra_term::GraphName;
    /// use rdf_pipeline::model::*;
    /// use rdf_pipeline::sparql::{UpdateOperation, UpdateOptions};
    /// use rdf_pipeline::store::Store;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::new();
    /// let ex = NamedNode::new("http://example.com")?;
    /// let triple = Triple::new(ex.clone(), ex.clone(), ex.clone());
    /// store.insert_into(&ex, triple.clone()).await?;
    ///
    /// let copy = UpdateOperation::Copy {
    ///     silent: false,
    ///     from: GraphName::NamedNode(ex),
    ///     to: GraphName::DefaultGraph,
    /// };
    /// store.execute_update(&[copy], UpdateOptions::default()).await?;
    /// assert!(store.contains(&triple).await?);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub async fn execute_update(
        &self,
        operations: &[UpdateOperation],
        options: impl Into<UpdateOptions>,
    ) -> Result<(), QueryEvaluationError> {
        debug!(operations = operations.len(), "Executing update");
        let context = match options.into().hints {
            Some(hints) => self.context().with_hints(hints),
            None => self.context(),
        };
        let result = execute_update(operations, &context).await;
        // Operations before a failing one have been applied.
        self.invalidate_cache();
        result
    }

    /// Adds a triple to the default graph.
    ///
    /// Returns `true` if the triple was not already part of the graph.
    pub async fn insert(&self, triple: Triple) -> Result<bool, StorageError> {
        let inserted = self.dataset.default_graph().insert(triple).await?;
        if inserted {
            self.invalidate_cache();
        }
        Ok(inserted)
    }

    /// Adds a triple to the named graph `graph`. Unknown graphs are created.
    pub async fn insert_into(
        &self,
        graph: &NamedNode,
        triple: Triple,
    ) -> Result<bool, QueryEvaluationError> {
        let target = match self.dataset.named_graph(graph) {
            Some(target) => target,
            None => self.dataset.create_graph(graph.clone())?,
        };
        let inserted = target.insert(triple).await?;
        if inserted {
            self.invalidate_cache();
        }
        Ok(inserted)
    }

    /// Removes a triple from the default graph.
    ///
    /// Returns `true` if the triple was part of the graph.
    pub async fn remove(&self, triple: &Triple) -> Result<bool, StorageError> {
        let removed = self.dataset.default_graph().delete(triple).await?;
        if removed {
            self.invalidate_cache();
        }
        Ok(removed)
    }

    /// Checks if the default graph contains `triple`.
    pub async fn contains(&self, triple: &Triple) -> Result<bool, QueryEvaluationError> {
        let context = self.context();
        let engine = context.engine();
        let matches = self
            .dataset
            .default_graph()
            .find(&triple_to_pattern(triple), context.query_context());
        Ok(!engine.limit(matches, 1).collect_vec().await?.is_empty())
    }

    /// Returns the IRIs of the named graphs.
    pub fn named_graphs(&self) -> Vec<NamedNode> {
        self.dataset.named_graph_iris()
    }

    fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("dataset", &self.dataset)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_pipeline_common::QueryHints;
    use rdf_pipeline_model::Literal;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    #[test]
    fn test_send_sync() {
        fn is_send_sync<T: Send + Sync>() {}
        is_send_sync::<Store>();
    }

    #[tokio::test]
    async fn insert_and_remove() {
        let store = Store::new();
        let triple = Triple::new(ex("s"), ex("p"), Literal::from("o"));

        assert!(store.insert(triple.clone()).await.unwrap());
        assert!(!store.insert(triple.clone()).await.unwrap());
        assert!(store.contains(&triple).await.unwrap());

        assert!(store.remove(&triple).await.unwrap());
        assert!(!store.contains(&triple).await.unwrap());
    }

    #[tokio::test]
    async fn insert_into_creates_the_graph() {
        let store = Store::new();

        store
            .insert_into(&ex("g"), Triple::new(ex("s"), ex("p"), ex("o")))
            .await
            .unwrap();

        assert_eq!(store.named_graphs(), vec![ex("g")]);
    }

    #[tokio::test]
    async fn cache_is_cleared_by_changes() {
        let config = EngineConfig::default()
            .with_cache_capacity(8)
            .with_hints(QueryHints::default().with_cache(true));
        let store = Store::with_config(config);
        store
            .insert(Triple::new(ex("a"), ex("p"), ex("b")))
            .await
            .unwrap();

        let count = |store: Store| async move {
            let QueryResults::Solutions(solutions) =
                store.query("SELECT * WHERE { ?s ?p ?o }").await.unwrap()
            else {
                unreachable!("SELECT yields solutions");
            };
            solutions.collect_solutions().await.unwrap().len()
        };

        assert_eq!(count(store.clone()).await, 1);
        store
            .insert(Triple::new(ex("b"), ex("p"), ex("c")))
            .await
            .unwrap();
        assert_eq!(count(store.clone()).await, 2);
        store
            .update("DELETE WHERE { ?s ?p <http://example.com/c> }")
            .await
            .unwrap();
        assert_eq!(count(store).await, 1);
    }

    #[tokio::test]
    async fn syntax_errors_are_reported() {
        let store = Store::new();

        let result = store.query("SELECT WHERE").await;

        assert!(matches!(result, Err(QueryEvaluationError::Parsing(_))));
    }
}
