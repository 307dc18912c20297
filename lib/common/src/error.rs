use rdf_pipeline_model::{NamedNode, SparqlSyntaxError, Variable};
use std::convert::Infallible;
use std::error::Error;
use std::io;

/// An error related to storage operations (reads, writes...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The graph does not provide an optional capability.
    #[error("The graph {0} does not support {1}")]
    Unsupported(NamedNode, &'static str),
    /// A lock guarding the graph content has been poisoned by a panicking writer.
    #[error("The content of graph {0} is no longer accessible")]
    Poisoned(NamedNode),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl From<StorageError> for io::Error {
    #[inline]
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => error,
            StorageError::Other(error) => Self::other(error),
            error => Self::other(error.to_string()),
        }
    }
}

/// A SPARQL evaluation error.
///
/// Errors that are expected during expression evaluation (e.g., a type error in a `FILTER`) are
/// represented by [ThinError](rdf_pipeline_model::ThinError) and never surface as a
/// [QueryEvaluationError].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// An error from the storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Error during `SERVICE` evaluation
    #[error("{0}")]
    Service(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// Error when `CREATE` tries to create an already existing graph
    #[error("The graph {0} already exists")]
    GraphAlreadyExists(NamedNode),
    /// Error when an operation refers to a graph that is not part of the dataset
    #[error("The graph {0} does not exist")]
    GraphDoesNotExist(NamedNode),
    /// The variable storing the `SERVICE` name is unbound
    #[error("The variable encoding the service name is unbound")]
    UnboundService,
    /// A function that is neither built-in nor registered as custom function.
    #[error("The function {0} is not supported")]
    UnknownFunction(String),
    /// An aggregate that is neither built-in nor registered as custom function.
    #[error("The aggregate {0} is not supported")]
    UnknownAggregate(String),
    /// An aggregate function failed on its input.
    #[error("The aggregate for {0} could not be computed")]
    Aggregate(Variable),
    /// Inconsistent use of the full-text search vocabulary.
    #[error("Invalid full-text search: {0}")]
    InvalidSearch(String),
    /// An update operation that the engine does not execute (e.g., `LOAD`).
    #[error("The update operation {0} is not supported")]
    UnsupportedUpdate(String),
    /// Writing query results failed.
    #[error(transparent)]
    ResultsSerialization(io::Error),
    #[error("A feature has not yet been implemented: {0}")]
    NotImplemented(String),
    #[error("An internal error that likely indicates towards a bug in the engine: {0}")]
    InternalError(String),
}

impl QueryEvaluationError {
    pub fn internal<T>(cause: String) -> Result<T, Self> {
        Err(QueryEvaluationError::InternalError(cause))
    }
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}
