//! Stage settings shared by the pipelines; loading and validation live in `config`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub audio_dir: String,
    pub features_csv: String,
    pub labeled_csv: String,
    pub plots_dir: String,
    pub processed_x_csv: String,
    pub processed_y_csv: String,
    pub scaler: String,
    pub model: String,
    pub confusion_matrix_plot: String,
    pub evaluation_report: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            audio_dir: "./dataset".to_string(),
            features_csv: "vocal_features.csv".to_string(),
            labeled_csv: "features_labeled.csv".to_string(),
            plots_dir: "plots".to_string(),
            processed_x_csv: "processed_X.csv".to_string(),
            processed_y_csv: "processed_y.csv".to_string(),
            scaler: "scaler.json".to_string(),
            model: "baseline_model.json".to_string(),
            confusion_matrix_plot: "plots/confusion_matrix.png".to_string(),
            evaluation_report: "evaluation_report.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub pitch_floor_hz: f64,
    pub pitch_ceiling_hz: f64,
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            pitch_floor_hz: 75.0,
            pitch_ceiling_hz: 600.0,
            n_mfcc: 13,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingSettings {
    /// 以 `-` 分割檔名後，情緒代碼所在的欄位
    pub emotion_field_index: usize,
    pub stressed_codes: Vec<i64>,
    pub neutral_codes: Vec<i64>,
    pub plot_features: Vec<String>,
}

impl Default for LabelingSettings {
    fn default() -> Self {
        Self {
            emotion_field_index: 2,
            stressed_codes: vec![4, 5, 6, 7, 8],
            neutral_codes: vec![1, 2, 3],
            plot_features: vec![
                "mean_pitch_hz".to_string(),
                "jitter_local".to_string(),
                "shimmer_local".to_string(),
                "speech_rate_onsets_per_sec".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub test_size: f64,
    pub random_seed: u64,
    pub max_iter: usize,
    /// 正則化強度的倒數 (C)
    pub regularization_c: f64,
    pub tolerance: f64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_seed: 42,
            max_iter: 1000,
            regularization_c: 1.0,
            tolerance: 1e-4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let extraction: ExtractionSettings = serde_json::from_str(r#"{"n_mfcc": 5}"#).unwrap();
        assert_eq!(extraction.n_mfcc, 5);
        assert_eq!(extraction.pitch_floor_hz, 75.0);

        let labeling: LabelingSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(labeling, LabelingSettings::default());
        assert_eq!(labeling.emotion_field_index, 2);
        assert_eq!(TrainingSettings::default().random_seed, 42);
        assert_eq!(PathSettings::default().labeled_csv, "features_labeled.csv");
    }
}
