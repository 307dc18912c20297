//! The stage builders.
//!
//! Every builder translates one construct of the SPARQL algebra into pipeline stages. A builder
//! receives the stage of incoming bindings and returns the stage of outgoing bindings. Malformed
//! constructs are rejected when the stages are built, before any binding is produced.

mod aggregate;
mod bgp;
mod blank_nodes;
mod distinct;
mod extend;
mod filter;
mod graph;
mod join;
mod minus;
mod modifiers;
mod order_by;
mod path;
mod service;

pub use aggregate::{build_group, GroupKey, GROUP_COLUMNS_PROPERTY};
pub use bgp::build_bgp;
pub use distinct::{build_distinct, build_reduced, distinct_key};
pub use extend::build_extend;
pub use filter::{build_exists_filter, build_filter};
pub use graph::build_graph;
pub use join::{build_join, build_left_join, build_union, build_values};
pub use minus::build_minus;
pub use modifiers::{build_project, build_slice};
pub use order_by::build_order_by;
pub use path::{build_paths, PathTriple};
pub use service::build_service;
