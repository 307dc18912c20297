#![doc(test(attr(deny(warnings))))]

//! This crate defines the execution engine of RDF Pipeline.
//!
//! # Plans
//!
//! A query is not compiled into a separate plan representation. Instead, the [PlanBuilder] walks
//! the SPARQL algebra top-down and lets one stage builder (see [stages]) translate each construct
//! into pipeline stages:
//!
//! ```text
//! Query String -> SPARQL Algebra (spargebra) -> Pipeline Stages -> Bindings
//! ```
//!
//! Every builder receives the stage of incoming bindings and returns the stage of outgoing
//! bindings. Builders that evaluate nested patterns (e.g., `GRAPH`, `EXISTS`, or sub-queries)
//! call back into the [PlanDispatcher] stored in the [ExecutionContext].
//!
//! # Storage
//!
//! Patterns are matched against the [Dataset](rdf_pipeline_storage::Dataset) of the context. The
//! join operators adapt to the capabilities of each graph, e.g., batching bindings into bound
//! joins if a graph can evaluate unions natively.
//!
//! # Queries and Updates
//!
//! [sparql::evaluate_query] evaluates `SELECT`, `ASK`, `CONSTRUCT`, and `DESCRIBE` queries, while
//! [update::execute_update] applies SPARQL updates to the dataset.

mod context;
mod path;
mod plan;
pub mod results;
pub mod sparql;
pub mod stages;
pub mod update;

#[cfg(test)]
mod test_utils;

pub use context::{ActiveGraph, ExecutionContext};
pub use path::{PropertyPathEvaluator, TraversalPathEvaluator};
pub use plan::{PlanBuilder, PlanDispatcher};
