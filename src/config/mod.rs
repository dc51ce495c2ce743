pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use crate::config::toml_config::PipelineSettings;
#[cfg(feature = "cli")]
use crate::utils::error::Result;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "vocal-stress")]
#[command(about = "Offline pipeline that turns speech recordings into a stressed/neutral classifier")]
pub struct CliConfig {
    /// Optional TOML file overriding the default paths and parameters
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Directory every relative path is resolved against
    #[arg(long, global = true, default_value = ".")]
    pub base_dir: String,

    /// Override `paths.audio_dir`
    #[arg(long, global = true)]
    pub audio_dir: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub stage: Stage,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Stage {
    /// Walk the audio directory and write the acoustic feature CSV
    Extract,
    /// Label features from filenames and draw exploratory plots
    Label,
    /// Standardise the feature columns and save the scaler
    Preprocess,
    /// Train and evaluate the baseline logistic regression
    Train,
    /// Run all four stages in order
    All,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 TOML (若有) 並套用命令列覆寫
    pub fn settings(&self) -> Result<PipelineSettings> {
        let mut settings = match &self.config {
            Some(path) => PipelineSettings::from_file(path)?,
            None => PipelineSettings::default(),
        };

        if let Some(audio_dir) = &self.audio_dir {
            settings.paths.audio_dir = audio_dir.clone();
        }

        Ok(settings)
    }
}
