use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("WAV decoding error: {0}")]
    WavError(#[from] hound::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Font loading error: {0}")]
    FontError(#[from] ab_glyph::InvalidFont),

    #[error("Input not found: {path}")]
    MissingInputError { path: String, hint: String },

    #[error("Audio analysis failed for {path}: {message}")]
    AudioError { path: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Audio,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingInputError { .. } => ErrorCategory::Input,
            Self::WavError(_) | Self::AudioError { .. } => ErrorCategory::Audio,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ProcessingError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Data,
            Self::IoError(_) | Self::ImageError(_) | Self::FontError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Audio => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingInputError { hint, .. } => hint.clone(),
            Self::WavError(_) | Self::AudioError { .. } => {
                "Check that the recording is a valid PCM/float WAV file".to_string()
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Review the TOML configuration file and command line flags".to_string()
            }
            Self::CsvError(_) => {
                "Make sure the CSV was produced by the previous stage and not edited by hand"
                    .to_string()
            }
            Self::SerializationError(_) => {
                "Re-run the stage that produces this artifact".to_string()
            }
            Self::ProcessingError { .. } | Self::ValidationError { .. } => {
                "Inspect the input data; run with --verbose for details".to_string()
            }
            Self::IoError(_) | Self::ImageError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            Self::FontError(_) => "The bundled plot font is corrupt; rebuild the binary".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingInputError { path, .. } => format!("'{}' not found", path),
            Self::AudioError { path, message } => {
                format!("Could not analyse '{}': {}", path, message)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
