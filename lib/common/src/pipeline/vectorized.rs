use crate::pipeline::{CatchHandler, Pipeline, PipelineResult, PipelineStage};
use crate::QueryEvaluationError;
use futures::future::ready;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use rustc_hash::FxHashSet;
use std::future::Future;
use std::hash::Hash;

/// A pipeline that materializes the entire input of every operator before producing its output.
///
/// Each stage is, in effect, a future of a vector. This trades memory for a simpler execution
/// profile. There is no early termination: a `LIMIT` still materializes its entire input.
#[derive(Clone, Copy, Debug, Default)]
pub struct VectorizedPipeline;

impl VectorizedPipeline {
    /// Materializes `stage` and transforms the resulting vector with `f`.
    fn materialized<T, U, F>(stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(Vec<T>) -> PipelineResult<Vec<U>> + Send + 'static,
    {
        Self::materialized_async(stage, |items| ready(f(items)))
    }

    fn materialized_async<T, U, F, Fut>(stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnOnce(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = PipelineResult<Vec<U>>> + Send + 'static,
    {
        let items = stream::once(async move {
            let items = stage.collect_vec().await?;
            f(items).await
        });
        PipelineStage::new(
            items
                .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
                .try_flatten(),
        )
    }
}

impl Pipeline for VectorizedPipeline {
    fn empty<T: Send + 'static>(&self) -> PipelineStage<T> {
        self.of(Vec::new())
    }

    fn of<T: Send + 'static>(&self, items: Vec<T>) -> PipelineStage<T> {
        PipelineStage::new(stream::iter(items.into_iter().map(Ok)))
    }

    fn from_iter<T, I>(&self, items: I) -> PipelineStage<T>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        self.of(items.into_iter().collect())
    }

    fn from_future<T, F>(&self, future: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: Future<Output = PipelineResult<T>> + Send + 'static,
    {
        PipelineStage::new(stream::once(future))
    }

    fn from_stream<T, S>(&self, stream: S) -> PipelineStage<T>
    where
        T: Send + 'static,
        S: Stream<Item = PipelineResult<T>> + Send + 'static,
    {
        Self::materialized(PipelineStage::new(stream), Ok)
    }

    fn error<T: Send + 'static>(&self, error: QueryEvaluationError) -> PipelineStage<T> {
        PipelineStage::new(stream::once(ready(Err(error))))
    }

    fn merge<T: Send + 'static>(&self, stages: Vec<PipelineStage<T>>) -> PipelineStage<T> {
        let items = stream::once(async move {
            let mut result = Vec::new();
            for stage in stages {
                result.extend(stage.collect_vec().await?);
            }
            Ok(result)
        });
        Self::materialized(PipelineStage::new(items), |mut items| {
            Ok(items.pop().unwrap_or_default())
        })
    }

    fn map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Self::materialized(stage, |items| Ok(items.into_iter().map(f).collect()))
    }

    fn try_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineResult<U> + Send + 'static,
    {
        Self::materialized(stage, |items| items.into_iter().map(f).collect())
    }

    fn filter<T, F>(&self, stage: PipelineStage<T>, mut predicate: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool + Send + 'static,
    {
        Self::materialized(stage, move |items| {
            Ok(items.into_iter().filter(|item| predicate(item)).collect())
        })
    }

    fn filter_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        Self::materialized(stage, |items| Ok(items.into_iter().filter_map(f).collect()))
    }

    fn merge_map<T, U, F>(&self, stage: PipelineStage<T>, mut f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineStage<U> + Send + 'static,
    {
        Self::materialized_async(stage, move |items| async move {
            let mut result = Vec::new();
            for item in items {
                result.extend(f(item).collect_vec().await?);
            }
            Ok(result)
        })
    }

    fn reduce<T, A, F>(&self, stage: PipelineStage<T>, initial: A, f: F) -> PipelineStage<A>
    where
        T: Send + 'static,
        A: Send + 'static,
        F: FnMut(A, T) -> A + Send + 'static,
    {
        Self::materialized(stage, move |items| {
            Ok(vec![items.into_iter().fold(initial, f)])
        })
    }

    fn limit<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T> {
        Self::materialized(stage, move |mut items| {
            items.truncate(n);
            Ok(items)
        })
    }

    fn skip<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T> {
        Self::materialized(stage, move |items| Ok(items.into_iter().skip(n).collect()))
    }

    fn distinct<T, K, F>(&self, stage: PipelineStage<T>, mut key: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&T) -> K + Send + 'static,
    {
        Self::materialized(stage, move |items| {
            let mut seen = FxHashSet::default();
            Ok(items
                .into_iter()
                .filter(|item| seen.insert(key(item)))
                .collect())
        })
    }

    fn buffer<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        size: usize,
    ) -> PipelineStage<Vec<T>> {
        let size = size.max(1);
        Self::materialized(stage, move |items| {
            let mut batches = Vec::with_capacity(items.len().div_ceil(size));
            let mut items = items.into_iter().peekable();
            while items.peek().is_some() {
                batches.push(items.by_ref().take(size).collect());
            }
            Ok(batches)
        })
    }

    fn collect<T: Send + 'static>(&self, stage: PipelineStage<T>) -> PipelineStage<Vec<T>> {
        Self::materialized(stage, |items| Ok(vec![items]))
    }

    fn default_if_empty<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        value: T,
    ) -> PipelineStage<T> {
        Self::materialized(stage, move |items| {
            Ok(if items.is_empty() { vec![value] } else { items })
        })
    }

    fn catch<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        handler: Option<CatchHandler<T>>,
    ) -> PipelineStage<T> {
        let Some(handler) = handler else {
            return stage;
        };
        let items = stream::once(async move {
            match stage.collect_vec().await {
                Ok(items) => Ok(items),
                Err(error) => handler(error).collect_vec().await,
            }
        });
        Self::materialized(PipelineStage::new(items), |mut items| {
            Ok(items.pop().unwrap_or_default())
        })
    }

    fn peek<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Clone + Send + 'static,
        U: Send + 'static,
        F: FnOnce(Option<&T>, PipelineStage<T>) -> PipelineStage<U> + Send + 'static,
    {
        Self::materialized_async(stage, move |items| {
            let first = items.first().cloned();
            let stage = f(first.as_ref(), VectorizedPipeline.of(items));
            stage.collect_vec()
        })
    }
}
