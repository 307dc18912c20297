//! The pipeline engine every operator of a query plan is built upon.
//!
//! A [PipelineStage] is a lazy description of a finite sequence of items. Operators never touch
//! a stage directly. Instead, they use a [Pipeline] implementation that decides *how* the stage
//! is evaluated:
//!
//! - [StreamingPipeline] produces items on demand. If a consumer stops polling (e.g., after a
//!   `LIMIT`), the upstream stops producing as well.
//! - [VectorizedPipeline] materializes the entire input of every operator before producing its
//!   output.
//!
//! [PipelineEngine] selects one of the realizations at runtime and is threaded through the
//! evaluation context.

mod streaming;
mod vectorized;

use crate::config::PipelineKind;
use crate::QueryEvaluationError;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::task::{Context, Poll};

pub use streaming::StreamingPipeline;
pub use vectorized::VectorizedPipeline;

pub type PipelineResult<T> = Result<T, QueryEvaluationError>;

/// Replaces the remainder of a failed stage.
pub type CatchHandler<T> =
    Box<dyn FnOnce(QueryEvaluationError) -> PipelineStage<T> + Send + 'static>;

/// A lazy, fallible sequence of items.
pub struct PipelineStage<T> {
    inner: BoxStream<'static, PipelineResult<T>>,
}

impl<T: Send + 'static> PipelineStage<T> {
    pub fn new(stream: impl Stream<Item = PipelineResult<T>> + Send + 'static) -> Self {
        Self {
            inner: stream.boxed(),
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, PipelineResult<T>> {
        self.inner
    }

    /// Drives the stage to completion and returns all items.
    pub async fn collect_vec(self) -> PipelineResult<Vec<T>> {
        self.inner.try_collect().await
    }

    /// Drives the stage to completion.
    ///
    /// `on_next` is called for every item. Afterward, exactly one of `on_error` and
    /// `on_complete` is called. The driver stops at the first error.
    pub async fn subscribe(
        mut self,
        mut on_next: impl FnMut(T),
        on_error: impl FnOnce(QueryEvaluationError),
        on_complete: impl FnOnce(),
    ) {
        while let Some(item) = self.inner.next().await {
            match item {
                Ok(item) => on_next(item),
                Err(error) => {
                    on_error(error);
                    return;
                }
            }
        }
        on_complete();
    }

    /// Drives the stage to completion, calling `f` for every item.
    pub async fn for_each(mut self, mut f: impl FnMut(T)) -> PipelineResult<()> {
        while let Some(item) = self.inner.next().await {
            f(item?);
        }
        Ok(())
    }
}

impl<T> Stream for PipelineStage<T> {
    type Item = PipelineResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> Debug for PipelineStage<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStage").finish_non_exhaustive()
    }
}

/// The operations available on [PipelineStage]s.
///
/// All intermediate operators are lazy. No work happens until the returned stage is driven.
pub trait Pipeline {
    /// A stage without any items.
    fn empty<T: Send + 'static>(&self) -> PipelineStage<T>;

    /// A stage with the given items.
    fn of<T: Send + 'static>(&self, items: Vec<T>) -> PipelineStage<T>;

    fn from_iter<T, I>(&self, items: I) -> PipelineStage<T>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static;

    /// A stage with the single item produced by `future`.
    fn from_future<T, F>(&self, future: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: Future<Output = PipelineResult<T>> + Send + 'static;

    /// A stage backed by an arbitrary stream.
    fn from_stream<T, S>(&self, stream: S) -> PipelineStage<T>
    where
        T: Send + 'static,
        S: Stream<Item = PipelineResult<T>> + Send + 'static;

    /// A stage that fails with `error`.
    fn error<T: Send + 'static>(&self, error: QueryEvaluationError) -> PipelineStage<T>;

    /// Interleaves the items of all stages. The order within a single stage is preserved.
    fn merge<T: Send + 'static>(&self, stages: Vec<PipelineStage<T>>) -> PipelineStage<T>;

    fn map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static;

    /// Maps every item with a fallible function. An error terminates the stage.
    fn try_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineResult<U> + Send + 'static;

    fn filter<T, F>(&self, stage: PipelineStage<T>, predicate: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool + Send + 'static;

    fn filter_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static;

    /// Maps every item to a stage and flattens the results.
    fn merge_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineStage<U> + Send + 'static;

    /// Folds all items into a single item.
    fn reduce<T, A, F>(&self, stage: PipelineStage<T>, initial: A, f: F) -> PipelineStage<A>
    where
        T: Send + 'static,
        A: Send + 'static,
        F: FnMut(A, T) -> A + Send + 'static;

    fn limit<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T>;

    fn skip<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T>;

    /// Removes items with a key that has already been seen.
    fn distinct<T, K, F>(&self, stage: PipelineStage<T>, key: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&T) -> K + Send + 'static;

    /// Groups consecutive items into batches of at most `size` items.
    fn buffer<T: Send + 'static>(&self, stage: PipelineStage<T>, size: usize)
        -> PipelineStage<Vec<T>>;

    /// Materializes the stage into a single item.
    fn collect<T: Send + 'static>(&self, stage: PipelineStage<T>) -> PipelineStage<Vec<T>>;

    /// Emits `value` if `stage` completes without any item.
    fn default_if_empty<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        value: T,
    ) -> PipelineStage<T>;

    /// Replaces the remainder of a failing stage with the stage returned by `handler`. Without a
    /// handler, the failure is propagated.
    fn catch<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        handler: Option<CatchHandler<T>>,
    ) -> PipelineStage<T>;

    /// Inspects the first item of `stage` without consuming it.
    ///
    /// `f` receives the first item (or [None] if the stage is empty) together with a stage that
    /// still contains every item of `stage`.
    fn peek<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Clone + Send + 'static,
        U: Send + 'static,
        F: FnOnce(Option<&T>, PipelineStage<T>) -> PipelineStage<U> + Send + 'static;
}

/// The pipeline realization of a query session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineEngine {
    #[default]
    Streaming,
    Vectorized,
}

impl PipelineEngine {
    pub fn kind(self) -> PipelineKind {
        match self {
            PipelineEngine::Streaming => PipelineKind::Streaming,
            PipelineEngine::Vectorized => PipelineKind::Vectorized,
        }
    }
}

impl From<PipelineKind> for PipelineEngine {
    fn from(kind: PipelineKind) -> Self {
        match kind {
            PipelineKind::Streaming => PipelineEngine::Streaming,
            PipelineKind::Vectorized => PipelineEngine::Vectorized,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            PipelineEngine::Streaming => StreamingPipeline.$method($($arg),*),
            PipelineEngine::Vectorized => VectorizedPipeline.$method($($arg),*),
        }
    };
}

impl Pipeline for PipelineEngine {
    fn empty<T: Send + 'static>(&self) -> PipelineStage<T> {
        dispatch!(self, empty())
    }

    fn of<T: Send + 'static>(&self, items: Vec<T>) -> PipelineStage<T> {
        dispatch!(self, of(items))
    }

    fn from_iter<T, I>(&self, items: I) -> PipelineStage<T>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        dispatch!(self, from_iter(items))
    }

    fn from_future<T, F>(&self, future: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: Future<Output = PipelineResult<T>> + Send + 'static,
    {
        dispatch!(self, from_future(future))
    }

    fn from_stream<T, S>(&self, stream: S) -> PipelineStage<T>
    where
        T: Send + 'static,
        S: Stream<Item = PipelineResult<T>> + Send + 'static,
    {
        dispatch!(self, from_stream(stream))
    }

    fn error<T: Send + 'static>(&self, error: QueryEvaluationError) -> PipelineStage<T> {
        dispatch!(self, error(error))
    }

    fn merge<T: Send + 'static>(&self, stages: Vec<PipelineStage<T>>) -> PipelineStage<T> {
        dispatch!(self, merge(stages))
    }

    fn map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        dispatch!(self, map(stage, f))
    }

    fn try_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineResult<U> + Send + 'static,
    {
        dispatch!(self, try_map(stage, f))
    }

    fn filter<T, F>(&self, stage: PipelineStage<T>, predicate: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        F: FnMut(&T) -> bool + Send + 'static,
    {
        dispatch!(self, filter(stage, predicate))
    }

    fn filter_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        dispatch!(self, filter_map(stage, f))
    }

    fn merge_map<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: FnMut(T) -> PipelineStage<U> + Send + 'static,
    {
        dispatch!(self, merge_map(stage, f))
    }

    fn reduce<T, A, F>(&self, stage: PipelineStage<T>, initial: A, f: F) -> PipelineStage<A>
    where
        T: Send + 'static,
        A: Send + 'static,
        F: FnMut(A, T) -> A + Send + 'static,
    {
        dispatch!(self, reduce(stage, initial, f))
    }

    fn limit<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T> {
        dispatch!(self, limit(stage, n))
    }

    fn skip<T: Send + 'static>(&self, stage: PipelineStage<T>, n: usize) -> PipelineStage<T> {
        dispatch!(self, skip(stage, n))
    }

    fn distinct<T, K, F>(&self, stage: PipelineStage<T>, key: F) -> PipelineStage<T>
    where
        T: Send + 'static,
        K: Eq + Hash + Send + 'static,
        F: FnMut(&T) -> K + Send + 'static,
    {
        dispatch!(self, distinct(stage, key))
    }

    fn buffer<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        size: usize,
    ) -> PipelineStage<Vec<T>> {
        dispatch!(self, buffer(stage, size))
    }

    fn collect<T: Send + 'static>(&self, stage: PipelineStage<T>) -> PipelineStage<Vec<T>> {
        dispatch!(self, collect(stage))
    }

    fn default_if_empty<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        value: T,
    ) -> PipelineStage<T> {
        dispatch!(self, default_if_empty(stage, value))
    }

    fn catch<T: Send + 'static>(
        &self,
        stage: PipelineStage<T>,
        handler: Option<CatchHandler<T>>,
    ) -> PipelineStage<T> {
        dispatch!(self, catch(stage, handler))
    }

    fn peek<T, U, F>(&self, stage: PipelineStage<T>, f: F) -> PipelineStage<U>
    where
        T: Clone + Send + 'static,
        U: Send + 'static,
        F: FnOnce(Option<&T>, PipelineStage<T>) -> PipelineStage<U> + Send + 'static,
    {
        dispatch!(self, peek(stage, f))
    }
}
