use crate::pipeline::{CatchHandler, Pipeline, PipelineResult, PipelineStage};
use crate::QueryEvaluationError;
use futures::future::ready;
use futures::stream::{self, TryChunksError};
use futures::{Stream, StreamExt, TryStreamExt};
use rustc_hash::FxHashSet;
use std::future::Future;
use std::hash::Hash;

/// A pull-based pipeline. Items are only produced when a consumer polls the stage.
///
/// Dropping a stage stops all upstream work. Hence, operators like [Pipeline::limit] only cause
/// a bounded amount of over-production.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamingPipeline;

impl Pipeline for StreamingPipeline {
    fn empty<T: Send + 'static>(&self) -> PipelineStage<T> {
        PipelineStage::new(stream::empty())
    }

    fn of<T: Send + 'static>(&self, items: Vec<T>) -> PipelineStage<T> {
        self.from_iter(items)
    }

    fn from_iter<T, I>(&self, items: I) -> PipelineStage<T>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        PipelineStage::new(stream::iter(items.into_iter().map(Ok)))
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
        PipelineStage::new(stream)
    }

    fn error<T: Send + 'static>(&self, error: QueryEvaluationError) -> PipelineStage<T> {
        PipelineStage::new(stream::once(ready(Err(error))))
    }

    fn merge<T: Send + 'static>(&self, stages: Vec<PipelineStage<T>>) -> PipelineStage<T> {
        PipelineStage::new(stream::select_all(stages))
    }

    fn map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        PipelineStage::new(stage.map_ok(f))
    }

    fn try_map<T, U, F>(&self, stage: PipelineStage<T>, mut f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineResult<U> + Send + 'static,
    {
        PipelineStage::new(stage.map(move |item| item.and_then(&mut f)))
    }

    fn filter<T, F>(&self, stage: PipelineStage<T>, mut predicate: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool + Send + 'static,
    {
        PipelineStage::new(stage.filter_map(move |item| {
            ready(match item {
                Ok(item) => predicate(&item).then_some(Ok(item)),
                Err(error) => Some(Err(error)),
            })
        }))
    }

    fn filter_map<T, U, F>(&self, stage: PipelineStage<T>, mut f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        PipelineStage::new(stage.filter_map(move |item| {
            ready(match item {
                Ok(item) => f(item).map(Ok),
                Err(error) => Some(Err(error)),
            })
        }))
    }

    fn merge_map<T, U, F>(&self, stage: PipelineStage<T>, mut f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineStage<U> + Send + 'static,
    {
        let stages = stage.map(move |item| match item {
            Ok(item) => f(item),
            Err(error) => StreamingPipeline.error(error),
        });
        PipelineStage::new(stages.flatten())
    }

    fn reduce<T, A, F>(&self, mut stage: PipelineStage<T>, initial: A, mut f: F) -> PipelineStage<A>
    where
        T: Send + 'static,
        A: Send + 'static,
        F: FnMut(A, T) -> A + Send + 'static,
    {
        self.from_future(async move {
            let mut accumulator = initial;
            while let Some(item) = stage.next().await {
                accumulator = f(accumulator, item?);
            }
            Ok(accumulator)
        })
    }

    fn limit<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T> {
        PipelineStage::new(stage.take(n))
    }

    fn skip<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T> {
        PipelineStage::new(stage.skip(n))
    }

    fn distinct<T, K, F>(&self, stage: PipelineStage<T>, mut key: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&T) -> K + Send + 'static,
    {
        let mut seen = FxHashSet::default();
        self.filter(stage, move |item| seen.insert(key(item)))
    }

    fn buffer<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        size: usize,
    ) -> PipelineStage<Vec<T>> {
        PipelineStage::new(
            stage
                .try_chunks(size.max(1))
                .map_err(|TryChunksError(_, error)| error),
        )
    }

    fn collect<T: Send + 'static>(&self, stage: PipelineStage<T>) -> PipelineStage<Vec<T>> {
        self.from_future(stage.collect_vec())
    }

    fn default_if_empty<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        value: T,
    ) -> PipelineStage<T> {
        let stages = stream::once(async move {
            let mut stage = stage;
            match stage.next().await {
                None => StreamingPipeline.of(vec![value]),
                Some(first) => PipelineStage::new(stream::once(ready(first)).chain(stage)),
            }
        });
        PipelineStage::new(stages.flatten())
    }

    fn catch<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        handler: Option<CatchHandler<T>>,
    ) -> PipelineStage<T> {
        let Some(handler) = handler else {
            return stage;
        };
        let stages = stage.scan(Some(handler), |handler, item| {
            ready(match (item, handler.take()) {
                (Ok(item), handler_slot) => {
                    *handler = handler_slot;
                    handler.as_ref().map(|_| StreamingPipeline.of(vec![item]))
                }
                // The handler is consumed by the first failure, after which the stage ends.
                (Err(error), Some(handler)) => Some(handler(error)),
                (Err(_), None) => None,
            })
        });
        PipelineStage::new(stages.flatten())
    }

    fn peek<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Clone + Send + 'static,
        U: Send + 'static,
        F: FnOnce(Option<&T>, PipelineStage<T>) -> PipelineStage<U> + Send + 'static,
    {
        let stages = stream::once(async move {
            let mut stage = stage;
            match stage.next().await {
                None => f(None, StreamingPipeline.empty()),
                Some(Err(error)) => StreamingPipeline.error(error),
                Some(Ok(first)) => {
                    let peeked = first.clone();
                    let stage = PipelineStage::new(stream::once(ready(Ok(first))).chain(stage));
                    f(Some(&peeked), stage)
                }
            }
        });
        PipelineStage::new(stages.flatten())
    }
}
