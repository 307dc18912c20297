#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod store;

pub mod model {
    pub use rdf_pipeline_model::*;
}

pub mod common {
    pub use rdf_pipeline_common::*;
}

pub mod storage {
    pub use rdf_pipeline_storage::*;
}

pub mod functions {
    pub use rdf_pipeline_functions::*;
}

pub mod execution {
    pub use rdf_pipeline_execution::*;
}

pub mod sparql {
    pub use rdf_pipeline_execution::sparql::*;
    pub use rdf_pipeline_execution::update::UpdateOperation;
}
