#![doc(test(attr(deny(warnings))))]

//! The storage contract of RDF Pipeline.
//!
//! A [Graph] only has to answer triple pattern lookups. Everything else (cardinality estimates,
//! batched union evaluation, keyword search) is optional and declared through
//! [GraphCapabilities]. The join operators in this crate adapt to the declared capabilities, so
//! the same query plan runs against very different backends.

mod bgp;
mod cache;
mod context;
mod dataset;
mod graph;
mod join;
mod memory;
pub mod pattern;
mod search;
mod union;

pub use bgp::{estimate_pattern_cost, evaluate_bgp, order_by_cardinality, structural_order};
pub use cache::BgpCache;
pub use context::QueryContext;
pub use dataset::{Dataset, GraphFactory, HashMapDataset, DEFAULT_GRAPH_IRI};
pub use graph::{Graph, GraphCapabilities};
pub use join::{bound_join, cached_eval_bgp, index_join, index_join_all, nested_loop_bgp_join};
pub use memory::MemoryGraph;
pub use search::{default_full_text_search, FullTextSearchQuery, ScoredTriple};
pub use union::{UnionGraph, UNION_GRAPH_IRI};
