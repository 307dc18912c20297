//! Expression evaluation for RDF Pipeline.
//!
//! This crate compiles SPARQL expressions and aggregates against a [FunctionRegistry] and
//! evaluates them on [Bindings](rdf_pipeline_model::Bindings). Expected evaluation failures are
//! reported as [ThinError](rdf_pipeline_model::ThinError).

pub mod aggregates;
mod builtin;
mod ebv;
mod expression;
mod order;
mod registry;
mod scalar;
mod value;

pub use aggregates::{Accumulator, CompiledAggregate};
pub use builtin::BuiltinName;
pub use ebv::effective_boolean_value;
pub use expression::{CompiledExpression, EXISTS_PROPERTY};
pub use order::{equals, order_terms, partial_compare};
pub use registry::{CustomFunction, CustomFunctionRef, FnCustomFunction, FunctionRegistry};
pub use value::{EvaluatedValue, TermSequence};
