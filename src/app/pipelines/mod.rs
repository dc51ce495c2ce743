pub mod extract_pipeline;
pub mod label_pipeline;
pub mod preprocess_pipeline;
pub mod train_pipeline;

use crate::domain::ports::Storage;
use crate::utils::error::{PipelineError, Result};

pub use extract_pipeline::ExtractPipeline;
pub use label_pipeline::{label_for_filename, LabelPipeline};
pub use preprocess_pipeline::PreprocessPipeline;
pub use train_pipeline::{EvaluationReport, TrainPipeline};

/// 讀取上一階段的輸出；不存在時回報 MissingInputError
pub(crate) async fn read_stage_input<S: Storage>(storage: &S, path: &str, hint: &str) -> Result<Vec<u8>> {
    if !storage.exists(path).await {
        return Err(PipelineError::MissingInputError {
            path: path.to_string(),
            hint: hint.to_string(),
        });
    }
    storage.read_file(path).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::toml_config::PipelineSettings;
    use crate::domain::ports::Storage;
    use crate::utils::error::{PipelineError, Result};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    pub struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        pub async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }

        pub async fn paths(&self) -> Vec<String> {
            let files = self.files.lock().await;
            let mut paths: Vec<String> = files.keys().cloned().collect();
            paths.sort();
            paths
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                PipelineError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            let files = self.files.lock().await;
            let prefix = format!("{}/", path.trim_end_matches('/'));
            files.contains_key(path) || files.keys().any(|k| k.starts_with(&prefix))
        }

        async fn list_files(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
            let files = self.files.lock().await;
            let prefix = format!("{}/", dir.trim_end_matches('/'));
            let mut matches: Vec<String> = files
                .keys()
                .filter(|k| k.starts_with(&prefix) && k.ends_with(extension))
                .cloned()
                .collect();
            matches.sort();
            Ok(matches)
        }
    }

    pub fn settings() -> PipelineSettings {
        let mut settings = PipelineSettings::default();
        settings.paths.audio_dir = "dataset".to_string();
        settings
    }

    /// 16-bit mono WAV，基頻 `freq` 的諧波音
    pub fn voiced_wav(freq: f64, seconds: f64, amplitude: f64) -> Vec<u8> {
        let sample_rate = 16000u32;
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let n = (sample_rate as f64 * seconds) as usize;
            for i in 0..n {
                let t = i as f64 / sample_rate as f64;
                let phase = 2.0 * std::f64::consts::PI * freq * t;
                let v = amplitude * (phase.sin() + 0.5 * (2.0 * phase).sin() + 0.25 * (3.0 * phase).sin()) / 1.75;
                writer.write_sample((v * i16::MAX as f64) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }
}
