use crate::app::pipelines::read_stage_input;
use crate::core::csv_io;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{Dataset, Label};
use crate::ml::{
    stratified_split, ClassificationReport, ConfusionMatrix, LogisticRegression,
    LogisticRegressionParams,
};
use crate::plot::render_confusion_matrix;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TARGET_NAMES: [&str; 2] = ["Label 0 (Neutral)", "Label 1 (Stressed)"];

/// Held-out evaluation written next to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub classification: ClassificationReport,
    pub confusion_matrix: ConfusionMatrix,
    pub n_train: usize,
    pub n_test: usize,
    pub test_size: f64,
    pub random_seed: u64,
    pub generated_at: DateTime<Utc>,
}

pub struct TrainedModel {
    pub model: LogisticRegression,
    pub evaluation: EvaluationReport,
    pub confusion_plot: Vec<u8>,
}

/// `processed_X.csv` + `processed_y.csv` → model, metrics and confusion-matrix plot.
pub struct TrainPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> TrainPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

fn print_evaluation(report: &ClassificationReport) {
    println!("\n--- Model Evaluation Results ---");
    println!("Accuracy on Test Set: {:.4}", report.accuracy);
    println!("\nClassification Report:");
    println!("{}", report.render(&TARGET_NAMES));
    println!("--------------------------------\n");
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for TrainPipeline<S, C> {
    type Extracted = Dataset;
    type Transformed = TrainedModel;

    fn name(&self) -> &'static str {
        "train"
    }

    async fn extract(&self) -> Result<Dataset> {
        let paths = self.config.paths();
        let hint = "run the preprocess stage first";
        let x = read_stage_input(&self.storage, &paths.processed_x_csv, hint).await?;
        let y = read_stage_input(&self.storage, &paths.processed_y_csv, hint).await?;
        let dataset = csv_io::read_dataset(&x, &y)?;
        tracing::info!(
            "📥 Successfully loaded processed data: {} rows, {} features",
            dataset.len(),
            dataset.n_features()
        );
        Ok(dataset)
    }

    async fn transform(&self, dataset: Dataset) -> Result<TrainedModel> {
        let training = self.config.training();

        let split = stratified_split(&dataset.labels, training.test_size, training.random_seed)?;
        let train = dataset.subset(&split.train);
        let test = dataset.subset(&split.test);
        tracing::info!(
            "Data split into {} training and {} testing rows (test_size = {})",
            train.len(),
            test.len(),
            training.test_size
        );

        let params = LogisticRegressionParams {
            c: training.regularization_c,
            max_iter: training.max_iter,
            tol: training.tolerance,
        };
        let model = LogisticRegression::fit(&train, &params)?;
        tracing::info!(
            "🧠 Baseline model trained in {} iterations (converged: {})",
            model.n_iter,
            model.converged
        );

        let predicted: Vec<Label> = model.predict(&test.rows);
        let report = ClassificationReport::from_predictions(&test.labels, &predicted);
        let confusion = ConfusionMatrix::from_predictions(&test.labels, &predicted);
        print_evaluation(&report);
        tracing::debug!("Confusion matrix: {:?}", confusion.counts);

        let confusion_plot = render_confusion_matrix(&confusion)?;

        let evaluation = EvaluationReport {
            accuracy: report.accuracy,
            classification: report,
            confusion_matrix: confusion,
            n_train: train.len(),
            n_test: test.len(),
            test_size: training.test_size,
            random_seed: training.random_seed,
            generated_at: Utc::now(),
        };

        Ok(TrainedModel {
            model,
            evaluation,
            confusion_plot,
        })
    }

    async fn load(&self, trained: TrainedModel) -> Result<String> {
        let paths = self.config.paths();

        self.storage
            .write_file(&paths.confusion_matrix_plot, &trained.confusion_plot)
            .await?;
        tracing::info!("📊 Confusion matrix plot saved to '{}'", paths.confusion_matrix_plot);

        let report = serde_json::to_string_pretty(&trained.evaluation)?;
        self.storage
            .write_file(&paths.evaluation_report, report.as_bytes())
            .await?;
        tracing::info!("💾 Evaluation report saved to '{}'", paths.evaluation_report);

        let model = trained.model.to_json()?;
        self.storage.write_file(&paths.model, model.as_bytes()).await?;
        tracing::info!("💾 Trained model saved to '{}'", paths.model);

        Ok(paths.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::{settings, MockStorage};
    use crate::core::EtlEngine;
    use crate::utils::error::PipelineError;

    /// 兩群可分的標準化資料
    async fn seed_processed(storage: &MockStorage, n_per_class: usize) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_per_class {
            let jitter = (i as f64 * 0.37).sin() * 0.3;
            rows.push(vec![-1.0 + jitter, 0.5 - jitter]);
            labels.push(Label::Neutral);
            rows.push(vec![1.0 - jitter, -0.5 + jitter]);
            labels.push(Label::Stressed);
        }
        let names = vec!["a".to_string(), "b".to_string()];
        storage
            .put_file("processed_X.csv", &csv_io::write_matrix(&names, &rows).unwrap())
            .await;
        storage
            .put_file("processed_y.csv", &csv_io::write_labels(&labels).unwrap())
            .await;
    }

    #[tokio::test]
    async fn test_train_stage_outputs() {
        let storage = MockStorage::new();
        seed_processed(&storage, 25).await;

        let engine = EtlEngine::new(TrainPipeline::new(storage.clone(), settings()));
        let output = engine.run().await.unwrap();
        assert_eq!(output, "baseline_model.json");

        let model = LogisticRegression::from_json(&storage.get_file(&output).await.unwrap()).unwrap();
        assert_eq!(model.feature_names, vec!["a", "b"]);
        assert!(model.converged);

        let report: EvaluationReport =
            serde_json::from_slice(&storage.get_file("evaluation_report.json").await.unwrap()).unwrap();
        assert_eq!(report.n_test, 10);
        assert_eq!(report.n_train, 40);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.confusion_matrix.counts, [[5, 0], [0, 5]]);

        let png = storage.get_file("plots/confusion_matrix.png").await.unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_row_mismatch_is_rejected() {
        let storage = MockStorage::new();
        seed_processed(&storage, 5).await;
        storage
            .put_file("processed_y.csv", &csv_io::write_labels(&[Label::Neutral]).unwrap())
            .await;

        let pipeline = TrainPipeline::new(storage, settings());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_missing_inputs() {
        let pipeline = TrainPipeline::new(MockStorage::new(), settings());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingInputError { .. }));
    }
}
