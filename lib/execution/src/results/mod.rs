//! The results of evaluating a query.
//!
//! Solutions and triples are produced lazily while the streams are polled.

use futures::{Stream, StreamExt};
use rdf_pipeline_common::QueryEvaluationError;
use rdf_pipeline_model::{Term, Triple, Variable};
use sparesults::{QueryResultsFormat, QueryResultsSerializer};
use std::io::Write;

mod query_solution;
mod triples;

pub use query_solution::{QuerySolution, QuerySolutionStream};
pub use triples::QueryTripleStream;

/// The variables that graph results are written with.
const TRIPLE_VARIABLES: [&str; 3] = ["subject", "predicate", "object"];

/// Results of a [SPARQL query](https://www.w3.org/TR/sparql11-query/).
pub enum QueryResults {
    /// Results of a [SELECT](https://www.w3.org/TR/sparql11-query/#select) query.
    Solutions(QuerySolutionStream),
    /// Result of an [ASK](https://www.w3.org/TR/sparql11-query/#ask) query.
    Boolean(bool),
    /// Results of a [CONSTRUCT](https://www.w3.org/TR/sparql11-query/#construct) or
    /// [DESCRIBE](https://www.w3.org/TR/sparql11-query/#describe) query.
    Graph(QueryTripleStream),
}

impl QueryResults {
    /// Serializes the results into `writer`.
    ///
    /// Graph results are written as solutions over the variables `subject`, `predicate` and
    /// `object`.
    pub async fn write<W: Write>(
        self,
        writer: W,
        format: QueryResultsFormat,
    ) -> Result<W, QueryEvaluationError> {
        let serializer = QueryResultsSerializer::from_format(format);
        match self {
            Self::Boolean(value) => serializer
                .serialize_boolean_to_writer(writer, value)
                .map_err(QueryEvaluationError::ResultsSerialization),
            Self::Solutions(solutions) => {
                let variables = solutions.variables().to_vec();
                let rows = solutions.map(|solution| {
                    solution.map(|solution| solution.iter().map(clone_entry).collect::<Vec<_>>())
                });
                write_rows(serializer, writer, variables, rows).await
            }
            Self::Graph(triples) => {
                let variables = TRIPLE_VARIABLES.map(Variable::new_unchecked).to_vec();
                let rows = triples.map(|triple| triple.map(triple_row));
                write_rows(serializer, writer, variables, rows).await
            }
        }
    }
}

fn clone_entry((variable, term): (&Variable, &Term)) -> (Variable, Term) {
    (variable.clone(), term.clone())
}

fn triple_row(triple: Triple) -> Vec<(Variable, Term)> {
    let [subject, predicate, object] = TRIPLE_VARIABLES.map(Variable::new_unchecked);
    vec![
        (subject, triple.subject.into()),
        (predicate, triple.predicate.into()),
        (object, triple.object),
    ]
}

async fn write_rows<W: Write>(
    serializer: QueryResultsSerializer,
    writer: W,
    variables: Vec<Variable>,
    mut rows: impl Stream<Item = Result<Vec<(Variable, Term)>, QueryEvaluationError>> + Unpin,
) -> Result<W, QueryEvaluationError> {
    let mut serializer = serializer
        .serialize_solutions_to_writer(writer, variables)
        .map_err(QueryEvaluationError::ResultsSerialization)?;
    while let Some(row) = rows.next().await {
        let row = row?;
        serializer
            .serialize(row.iter().map(|(variable, term)| (variable.as_ref(), term.as_ref())))
            .map_err(QueryEvaluationError::ResultsSerialization)?;
    }
    serializer
        .finish()
        .map_err(QueryEvaluationError::ResultsSerialization)
}
