use crate::app::pipelines::read_stage_input;
use crate::core::csv_io;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{Dataset, LabeledTable};
use crate::ml::StandardScaler;
use crate::utils::error::Result;

pub struct Preprocessed {
    pub scaler: StandardScaler,
    pub scaled: Dataset,
}

/// `features_labeled.csv` → standardised X, y and the fitted scaler.
pub struct PreprocessPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> PreprocessPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PreprocessPipeline<S, C> {
    type Extracted = LabeledTable;
    type Transformed = Preprocessed;

    fn name(&self) -> &'static str {
        "preprocess"
    }

    async fn extract(&self) -> Result<LabeledTable> {
        let path = &self.config.paths().labeled_csv;
        let data = read_stage_input(&self.storage, path, "run the label stage first").await?;
        let labeled = csv_io::read_labeled_table(&data)?;
        tracing::info!("📥 Successfully loaded '{}'", path);
        Ok(labeled)
    }

    async fn transform(&self, labeled: LabeledTable) -> Result<Preprocessed> {
        // filename 與 label 以外的欄位都是特徵
        let feature_names = labeled.table.feature_names.clone();
        let rows: Vec<Vec<f64>> = labeled.table.records.into_iter().map(|r| r.values).collect();
        tracing::info!("Shape of feature set (X): ({}, {})", rows.len(), feature_names.len());

        let (scaler, scaled_rows) = StandardScaler::fit_transform(&feature_names, &rows)?;
        tracing::info!("Features scaled successfully");

        Ok(Preprocessed {
            scaler,
            scaled: Dataset {
                feature_names,
                rows: scaled_rows,
                labels: labeled.labels,
            },
        })
    }

    async fn load(&self, output: Preprocessed) -> Result<String> {
        let paths = self.config.paths();
        let dataset = &output.scaled;

        let x = csv_io::write_matrix(&dataset.feature_names, &dataset.rows)?;
        self.storage.write_file(&paths.processed_x_csv, &x).await?;
        tracing::info!("💾 Processed features saved to '{}'", paths.processed_x_csv);

        let y = csv_io::write_labels(&dataset.labels)?;
        self.storage.write_file(&paths.processed_y_csv, &y).await?;
        tracing::info!("💾 Labels saved to '{}'", paths.processed_y_csv);

        let scaler = output.scaler.to_json()?;
        self.storage.write_file(&paths.scaler, scaler.as_bytes()).await?;
        tracing::info!("💾 Scaler saved to '{}'", paths.scaler);

        Ok(paths.processed_x_csv.clone())
    }
}
