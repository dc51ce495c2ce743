use crate::domain::ports::ConfigProvider;
use crate::domain::settings::{ExtractionSettings, LabelingSettings, PathSettings, TrainingSettings};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 整條 pipeline 的設定；每個欄位都有預設值，TOML 檔只需覆寫需要的部分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub paths: PathSettings,
    pub extraction: ExtractionSettings,
    pub labeling: LabelingSettings,
    pub training: TrainingSettings,
}

impl PipelineSettings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::MissingInputError {
                path: path.display().to_string(),
                hint: "Pass an existing TOML file with --config, or omit it to use defaults"
                    .to_string(),
            },
            _ => PipelineError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATASET_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for PathSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_path("paths.audio_dir", &self.audio_dir)?;
        validation::validate_path("paths.plots_dir", &self.plots_dir)?;

        for (field, file) in [
            ("paths.features_csv", &self.features_csv),
            ("paths.labeled_csv", &self.labeled_csv),
            ("paths.processed_x_csv", &self.processed_x_csv),
            ("paths.processed_y_csv", &self.processed_y_csv),
        ] {
            validation::validate_path(field, file)?;
            validation::validate_file_extension(field, file, &["csv"])?;
        }

        for (field, file) in [
            ("paths.scaler", &self.scaler),
            ("paths.model", &self.model),
            ("paths.evaluation_report", &self.evaluation_report),
        ] {
            validation::validate_path(field, file)?;
            validation::validate_file_extension(field, file, &["json"])?;
        }

        validation::validate_path("paths.confusion_matrix_plot", &self.confusion_matrix_plot)?;
        validation::validate_file_extension(
            "paths.confusion_matrix_plot",
            &self.confusion_matrix_plot,
            &["png"],
        )
    }
}

impl Validate for ExtractionSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_range("extraction.pitch_floor_hz", self.pitch_floor_hz, 1.0, 10_000.0)?;
        if self.pitch_ceiling_hz <= self.pitch_floor_hz {
            return Err(PipelineError::InvalidConfigValueError {
                field: "extraction.pitch_ceiling_hz".to_string(),
                value: self.pitch_ceiling_hz.to_string(),
                reason: format!(
                    "Pitch ceiling must be above the pitch floor ({} Hz)",
                    self.pitch_floor_hz
                ),
            });
        }
        validation::validate_positive_number("extraction.n_mfcc", self.n_mfcc, 1)?;
        validation::validate_positive_number("extraction.n_fft", self.n_fft, 16)?;
        validation::validate_positive_number("extraction.hop_length", self.hop_length, 1)?;
        validation::validate_positive_number("extraction.n_mels", self.n_mels, 1)?;
        if self.n_mfcc > self.n_mels {
            return Err(PipelineError::InvalidConfigValueError {
                field: "extraction.n_mfcc".to_string(),
                value: self.n_mfcc.to_string(),
                reason: format!("Cannot exceed extraction.n_mels ({})", self.n_mels),
            });
        }
        Ok(())
    }
}

impl Validate for LabelingSettings {
    fn validate(&self) -> Result<()> {
        if self.stressed_codes.is_empty() || self.neutral_codes.is_empty() {
            return Err(PipelineError::MissingConfigError {
                field: "labeling.stressed_codes / labeling.neutral_codes".to_string(),
            });
        }
        validation::validate_disjoint(
            "labeling.stressed_codes",
            &self.stressed_codes,
            &self.neutral_codes,
        )?;
        for feature in &self.plot_features {
            validation::validate_non_empty_string("labeling.plot_features", feature)?;
        }
        Ok(())
    }
}

impl Validate for TrainingSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_open_range("training.test_size", self.test_size, 0.0, 1.0)?;
        validation::validate_positive_number("training.max_iter", self.max_iter, 1)?;
        if !(self.regularization_c > 0.0 && self.regularization_c.is_finite()) {
            return Err(PipelineError::InvalidConfigValueError {
                field: "training.regularization_c".to_string(),
                value: self.regularization_c.to_string(),
                reason: "Must be a positive, finite number".to_string(),
            });
        }
        validation::validate_open_range("training.tolerance", self.tolerance, 0.0, 1.0)
    }
}

impl Validate for PipelineSettings {
    fn validate(&self) -> Result<()> {
        self.paths.validate()?;
        self.extraction.validate()?;
        self.labeling.validate()?;
        self.training.validate()
    }
}

impl ConfigProvider for PipelineSettings {
    fn paths(&self) -> &PathSettings {
        &self.paths
    }

    fn extraction(&self) -> &ExtractionSettings {
        &self.extraction
    }

    fn labeling(&self) -> &LabelingSettings {
        &self.labeling
    }

    fn training(&self) -> &TrainingSettings {
        &self.training
    }
}
