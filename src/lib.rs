pub mod app;
pub mod audio;
pub mod config;
pub mod core;
pub mod domain;
pub mod ml;
pub mod plot;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Stage};

pub use app::pipelines::{ExtractPipeline, LabelPipeline, PreprocessPipeline, TrainPipeline};
pub use config::cli::LocalStorage;
pub use config::toml_config::PipelineSettings;
pub use core::etl::EtlEngine;
pub use utils::error::{PipelineError, Result};
