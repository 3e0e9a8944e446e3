// Vidshift - Library Entry Point

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod filters;
pub mod metadata;
pub mod params;
pub mod pipeline;
pub mod rehash;
pub mod tools;
pub mod transcode;
pub mod watermark;

pub use config::PipelineConfig;
pub use error::{Result, TranscodeFailure, VidshiftError};
pub use params::{ParameterMode, TransformParameters};
pub use pipeline::{BatchReport, BatchRequest, Pipeline};
pub use rehash::RehashStrategy;
