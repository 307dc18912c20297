use futures::{Stream, StreamExt};
use rdf_pipeline_common::{PipelineStage, QueryEvaluationError};
use rdf_pipeline_model::{Bindings, Variable};
pub use sparesults::QuerySolution;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

/// A stream over [`QuerySolution`]s.
pub struct QuerySolutionStream {
    /// The variables used in the query solutions.
    variables: Arc<[Variable]>,
    /// The bindings produced by the query plan.
    inner: PipelineStage<Bindings>,
}

impl QuerySolutionStream {
    /// Creates a stream of solutions over `variables` from the bindings of a query plan.
    ///
    /// Variables of a binding that are not part of `variables` are dropped.
    pub fn new(variables: Arc<[Variable]>, inner: PipelineStage<Bindings>) -> Self {
        Self { variables, inner }
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_ref()
    }

    /// Returns the underlying stage of bindings.
    pub fn into_bindings(self) -> PipelineStage<Bindings> {
        self.inner
    }

    /// Consumes the stream and returns all solutions.
    pub async fn collect_solutions(mut self) -> Result<Vec<QuerySolution>, QueryEvaluationError> {
        let mut solutions = Vec::new();
        while let Some(solution) = self.next().await {
            solutions.push(solution?);
        }
        Ok(solutions)
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<QuerySolution, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let next = ready!(self.inner.poll_next_unpin(cx));
        Poll::Ready(next.map(|bindings| Ok(to_query_solution(&self.variables, &bindings?))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn to_query_solution(variables: &Arc<[Variable]>, bindings: &Bindings) -> QuerySolution {
    let values = variables
        .iter()
        .map(|variable| bindings.get(variable).cloned())
        .collect::<Vec<_>>();
    (Arc::clone(variables), values).into()
}
