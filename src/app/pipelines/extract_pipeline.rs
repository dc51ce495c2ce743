use crate::app::pipelines::read_stage_input;
use crate::audio::{decode_wav, extract_vocal_features, feature_columns};
use crate::core::csv_io;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{FeatureRecord, FeatureTable};
use crate::utils::error::{PipelineError, Result};
use std::path::Path;

const WAV_EXTENSION: &str = ".wav";

/// Audio directory → `vocal_features.csv`.
pub struct ExtractPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ExtractPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn analyse_file(&self, path: &str) -> Result<FeatureRecord> {
        let bytes = read_stage_input(&self.storage, path, "check the audio directory").await?;
        let settings = self.config.extraction().clone();

        // 特徵計算是 CPU 密集工作，移到 blocking 執行緒
        let features = tokio::task::spawn_blocking(move || {
            let clip = decode_wav(&bytes)?;
            extract_vocal_features(&clip, &settings)
        })
        .await
        .map_err(|e| PipelineError::processing(format!("feature task failed: {}", e)))??;

        let filename = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        Ok(FeatureRecord {
            filename,
            values: features.to_values(),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExtractPipeline<S, C> {
    type Extracted = Vec<String>;
    type Transformed = FeatureTable;

    fn name(&self) -> &'static str {
        "extract"
    }

    async fn extract(&self) -> Result<Vec<String>> {
        let audio_dir = &self.config.paths().audio_dir;
        tracing::info!("📂 Scanning audio directory: {}", audio_dir);

        if !self.storage.exists(audio_dir).await {
            return Err(PipelineError::MissingInputError {
                path: audio_dir.clone(),
                hint: "set --audio-dir or [paths].audio_dir to the dataset root".to_string(),
            });
        }

        let files = self.storage.list_files(audio_dir, WAV_EXTENSION).await?;
        tracing::info!("Found {} WAV files", files.len());
        Ok(files)
    }

    async fn transform(&self, files: Vec<String>) -> Result<FeatureTable> {
        let mut table = FeatureTable::new(feature_columns(self.config.extraction().n_mfcc));
        let total = files.len();

        for (i, path) in files.iter().enumerate() {
            tracing::debug!("🎵 [{}/{}] Processing: {}", i + 1, total, path);
            match self.analyse_file(path).await {
                Ok(record) => table.records.push(record),
                Err(e) => {
                    // 單一檔案失敗不影響整批
                    let err = PipelineError::AudioError {
                        path: path.clone(),
                        message: e.to_string(),
                    };
                    tracing::warn!("⚠️ Skipping file: {}", err);
                }
            }
        }

        if table.is_empty() {
            return Err(PipelineError::processing(
                "no features were extracted; check the audio directory and files",
            ));
        }

        tracing::info!(
            "Extracted features from {} of {} files ({} skipped)",
            table.len(),
            total,
            total - table.len()
        );
        Ok(table)
    }

    async fn load(&self, table: FeatureTable) -> Result<String> {
        let output_path = self.config.paths().features_csv.clone();
        let data = csv_io::write_feature_table(&table)?;
        self.storage.write_file(&output_path, &data).await?;
        tracing::info!("💾 Data for {} files saved to: {}", table.len(), output_path);
        Ok(output_path)
    }
}
