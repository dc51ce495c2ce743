use crate::app::pipelines::read_stage_input;
use crate::domain::settings::LabelingSettings;
use crate::core::csv_io;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{FeatureTable, Label, LabeledTable};
use crate::plot::{render_boxplot, BoxStats};
use crate::utils::error::{PipelineError, Result};

/// Emotion code from a `-`-separated filename, mapped to the stress label.
///
/// `03-01-05-01-01-01-01.wav` has code `05` at index 2 and is Stressed with
/// the default code sets. Unknown codes and malformed names yield `None`.
pub fn label_for_filename(filename: &str, settings: &LabelingSettings) -> Option<Label> {
    let code: i64 = filename
        .split('-')
        .nth(settings.emotion_field_index)?
        .trim()
        .parse()
        .ok()?;

    if settings.stressed_codes.contains(&code) {
        Some(Label::Stressed)
    } else if settings.neutral_codes.contains(&code) {
        Some(Label::Neutral)
    } else {
        None
    }
}

pub struct LabeledOutput {
    pub labeled: LabeledTable,
    /// (feature name, PNG bytes)
    pub plots: Vec<(String, Vec<u8>)>,
}

/// `vocal_features.csv` → `features_labeled.csv` + per-feature boxplots.
pub struct LabelPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> LabelPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn apply_labels(&self, table: FeatureTable) -> LabeledTable {
        let settings = self.config.labeling();
        let mut labeled = LabeledTable {
            table: FeatureTable::new(table.feature_names),
            labels: Vec::new(),
        };

        for record in table.records {
            match label_for_filename(&record.filename, settings) {
                Some(label) => {
                    labeled.table.records.push(record);
                    labeled.labels.push(label);
                }
                None => tracing::debug!("No label for {}, dropping row", record.filename),
            }
        }
        labeled
    }

    fn plot_feature(&self, labeled: &LabeledTable, feature: &str) -> Result<Option<Vec<u8>>> {
        let Some(values) = labeled.table.column(feature) else {
            tracing::warn!("⚠️ Feature '{}' not found, skipping plot", feature);
            return Ok(None);
        };

        let groups: Vec<(Label, Vec<f64>)> = Label::ALL
            .iter()
            .map(|&label| {
                let group = values
                    .iter()
                    .zip(&labeled.labels)
                    .filter(|(_, l)| **l == label)
                    .map(|(v, _)| *v)
                    .collect::<Vec<f64>>();
                (label, group)
            })
            .filter(|(_, group)| !group.is_empty())
            .collect();

        for (label, group) in &groups {
            if let Some(stats) = BoxStats::compute(group) {
                tracing::info!(
                    "{} | label {}: q1={:.4} median={:.4} q3={:.4} outliers={}",
                    feature,
                    label.as_i64(),
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.outliers.len()
                );
            }
        }

        if !groups.iter().any(|(_, g)| g.iter().any(|v| v.is_finite())) {
            tracing::warn!("⚠️ Feature '{}' has no finite values, skipping plot", feature);
            return Ok(None);
        }
        render_boxplot(feature, &groups).map(Some)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for LabelPipeline<S, C> {
    type Extracted = FeatureTable;
    type Transformed = LabeledOutput;

    fn name(&self) -> &'static str {
        "label"
    }

    async fn extract(&self) -> Result<FeatureTable> {
        let path = &self.config.paths().features_csv;
        let data = read_stage_input(&self.storage, path, "run the extract stage first").await?;
        let table = csv_io::read_feature_table(&data)?;
        tracing::info!("📥 Successfully loaded '{}'", path);
        Ok(table)
    }

    async fn transform(&self, table: FeatureTable) -> Result<LabeledOutput> {
        let total = table.len();
        let labeled = self.apply_labels(table);
        if labeled.table.is_empty() {
            return Err(PipelineError::processing(
                "no rows could be labeled from their filenames",
            ));
        }

        let (rows, cols) = labeled.shape();
        tracing::info!("Dataset shape: ({}, {}), dropped {} unlabeled rows", rows, cols, total - rows);
        for (label, count) in labeled.label_counts() {
            tracing::info!("label {} ({}): {}", label.as_i64(), label.display_name(), count);
        }

        let mut plots = Vec::new();
        for feature in &self.config.labeling().plot_features {
            if let Some(png) = self.plot_feature(&labeled, feature)? {
                plots.push((feature.clone(), png));
            }
        }

        Ok(LabeledOutput { labeled, plots })
    }

    async fn load(&self, output: LabeledOutput) -> Result<String> {
        let paths = self.config.paths();

        for (feature, png) in &output.plots {
            let plot_path = format!("{}/{}_boxplot.png", paths.plots_dir.trim_end_matches('/'), feature);
            self.storage.write_file(&plot_path, png).await?;
            tracing::info!("📊 Boxplot saved to: {}", plot_path);
        }

        let data = csv_io::write_labeled_table(&output.labeled)?;
        self.storage.write_file(&paths.labeled_csv, &data).await?;
        tracing::info!("💾 Labeled data saved to: {}", paths.labeled_csv);
        Ok(paths.labeled_csv.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::{settings, MockStorage};
    use crate::core::EtlEngine;
    use crate::domain::model::FeatureRecord;

    #[test]
    fn test_label_for_filename() {
        let s = LabelingSettings::default();
        assert_eq!(label_for_filename("03-01-05-01-01-01-01.wav", &s), Some(Label::Stressed));
        assert_eq!(label_for_filename("03-01-08-02-02-02-12.wav", &s), Some(Label::Stressed));
        assert_eq!(label_for_filename("03-01-01-01-01-01-01.wav", &s), Some(Label::Neutral));
        assert_eq!(label_for_filename("03-01-03-01-01-01-01.wav", &s), Some(Label::Neutral));
        assert_eq!(label_for_filename("03-01-09-01-01-01-01.wav", &s), None);
        assert_eq!(label_for_filename("03-01-xx-01.wav", &s), None);
        assert_eq!(label_for_filename("noise.wav", &s), None);
    }

    #[test]
    fn test_custom_field_index() {
        let s = LabelingSettings {
            emotion_field_index: 0,
            ..LabelingSettings::default()
        };
        assert_eq!(label_for_filename("6-foo.wav", &s), Some(Label::Stressed));
    }

    fn features_csv() -> Vec<u8> {
        let names = ["03-01-01-01-01-01-01.wav", "03-01-05-01-01-01-01.wav", "03-01-02-01-01-01-02.wav",
            "03-01-06-01-01-01-02.wav", "03-01-09-01-01-01-03.wav"];
        let mut table = FeatureTable::new(vec![
            "mean_pitch_hz".to_string(),
            "jitter_local".to_string(),
            "shimmer_local".to_string(),
            "speech_rate_onsets_per_sec".to_string(),
        ]);
        for (i, name) in names.iter().enumerate() {
            let x = i as f64;
            table.records.push(FeatureRecord {
                filename: name.to_string(),
                values: vec![150.0 + 10.0 * x, 0.01 + 0.001 * x, 0.05 + 0.01 * x, 2.0 + x],
            });
        }
        csv_io::write_feature_table(&table).unwrap()
    }

    #[tokio::test]
    async fn test_label_stage_writes_csv_and_plots() {
        let storage = MockStorage::new();
        storage.put_file("vocal_features.csv", &features_csv()).await;

        let engine = EtlEngine::new(LabelPipeline::new(storage.clone(), settings()));
        let output = engine.run().await.unwrap();
        assert_eq!(output, "features_labeled.csv");

        let labeled = csv_io::read_labeled_table(&storage.get_file(&output).await.unwrap()).unwrap();
        // 代碼 09 的列被移除
        assert_eq!(labeled.shape(), (4, 6));
        assert_eq!(
            labeled.labels,
            vec![Label::Neutral, Label::Stressed, Label::Neutral, Label::Stressed]
        );

        let paths = storage.paths().await;
        for feature in ["mean_pitch_hz", "jitter_local", "shimmer_local", "speech_rate_onsets_per_sec"] {
            let plot = format!("plots/{}_boxplot.png", feature);
            assert!(paths.contains(&plot), "missing {}", plot);
        }
    }

    #[tokio::test]
    async fn test_missing_features_csv() {
        let pipeline = LabelPipeline::new(MockStorage::new(), settings());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingInputError { .. }));
    }

    #[tokio::test]
    async fn test_no_labeled_rows_writes_nothing() {
        let mut table = FeatureTable::new(vec!["mean_pitch_hz".to_string()]);
        for name in ["03-01-09-01-01-01-01.wav", "noise.wav"] {
            table.records.push(FeatureRecord {
                filename: name.to_string(),
                values: vec![180.0],
            });
        }
        let storage = MockStorage::new();
        storage
            .put_file("vocal_features.csv", &csv_io::write_feature_table(&table).unwrap())
            .await;

        let engine = EtlEngine::new(LabelPipeline::new(storage.clone(), settings()));
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::ProcessingError { .. }));
        assert_eq!(storage.paths().await, vec!["vocal_features.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_plot_feature_is_skipped() {
        let storage = MockStorage::new();
        storage.put_file("vocal_features.csv", &features_csv()).await;
        let mut cfg = settings();
        cfg.labeling.plot_features = vec!["mean_pitch_hz".to_string(), "not_a_feature".to_string()];

        let pipeline = LabelPipeline::new(storage, cfg);
        let table = pipeline.extract().await.unwrap();
        let output = pipeline.transform(table).await.unwrap();
        assert_eq!(output.plots.len(), 1);
        assert_eq!(output.plots[0].0, "mean_pitch_hz");
    }
}
