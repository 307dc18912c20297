//! [SPARQL](https://www.w3.org/TR/sparql11-overview/) implementation.

mod eval;

pub use crate::results::{QueryResults, QuerySolution, QuerySolutionStream, QueryTripleStream};
pub use eval::evaluate_query;
pub use rdf_pipeline_model::{Query, QueryDataset, SparqlSyntaxError, Update, Variable};

use rdf_pipeline_common::QueryHints;

/// Options for SPARQL query evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Replaces the hints of the engine configuration for this query.
    pub hints: Option<QueryHints>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_hints(mut self, hints: QueryHints) -> Self {
        self.hints = Some(hints);
        self
    }
}

/// Options for SPARQL update evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Replaces the hints of the engine configuration for the `WHERE` clauses of the update.
    pub hints: Option<QueryHints>,
}

impl From<QueryOptions> for UpdateOptions {
    #[inline]
    fn from(query_options: QueryOptions) -> Self {
        Self {
            hints: query_options.hints,
        }
    }
}
