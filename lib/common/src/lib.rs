mod config;
pub mod error;
pub mod pipeline;

pub use config::*;
pub use error::{QueryEvaluationError, StorageError};
pub use pipeline::{
    CatchHandler, Pipeline, PipelineEngine, PipelineResult, PipelineStage, StreamingPipeline,
    VectorizedPipeline,
};
