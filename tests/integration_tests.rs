use std::path::Path;
use tempfile::TempDir;
use vocal_stress::core::csv_io;
use vocal_stress::domain::model::Label;
use vocal_stress::ml::{LogisticRegression, StandardScaler};
use vocal_stress::utils::error::ErrorCategory;
use vocal_stress::{
    EtlEngine, ExtractPipeline, LabelPipeline, LocalStorage, PipelineError, PipelineSettings,
    PreprocessPipeline, TrainPipeline,
};

const SAMPLE_RATE: u32 = 16000;

/// 16-bit mono WAV with a few harmonics of `freq`, gently amplitude modulated.
fn write_voice(path: &Path, freq: f64, amplitude: f64, seconds: f64) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (SAMPLE_RATE as f64 * seconds) as usize;
    for i in 0..n {
        let t = i as f64 / SAMPLE_RATE as f64;
        let phase = 2.0 * std::f64::consts::PI * freq * t;
        let envelope = 0.8 + 0.2 * (2.0 * std::f64::consts::PI * 3.0 * t).sin();
        let v = amplitude * envelope * (phase.sin() + 0.4 * (2.0 * phase).sin()) / 1.4;
        writer.write_sample((v * i16::MAX as f64) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// RAVDESS-style names: the third field is the emotion code.
fn seed_dataset(root: &Path) {
    for actor in 1..=6 {
        let dir = root.join("dataset").join(format!("Actor_{:02}", actor));
        let shift = actor as f64 * 4.0;
        write_voice(
            &dir.join(format!("03-01-01-01-01-01-{:02}.wav", actor)),
            120.0 + shift,
            0.3,
            0.6,
        );
        write_voice(
            &dir.join(format!("03-01-05-02-01-01-{:02}.wav", actor)),
            260.0 + shift,
            0.7,
            0.6,
        );
    }
    // 無法標記的情緒代碼、非 WAV 檔與壞檔
    write_voice(
        &root.join("dataset/Actor_01/03-01-09-01-01-01-01.wav"),
        200.0,
        0.5,
        0.6,
    );
    std::fs::write(root.join("dataset/Actor_01/notes.txt"), "ignore me").unwrap();
    std::fs::write(root.join("dataset/Actor_02/03-01-04-01-01-01-02.wav"), b"RIFF").unwrap();
}

fn storage_for(temp_dir: &TempDir) -> LocalStorage {
    LocalStorage::new(temp_dir.path().to_string_lossy().into_owned())
}

#[tokio::test]
async fn test_end_to_end_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    seed_dataset(temp_dir.path());
    let storage = storage_for(&temp_dir);
    let mut settings = PipelineSettings::default();
    settings.paths.audio_dir = "dataset".to_string();

    // extract
    let output = EtlEngine::new(ExtractPipeline::new(storage.clone(), settings.clone()))
        .run()
        .await
        .unwrap();
    let features_path = temp_dir.path().join(&output);
    let table = csv_io::read_feature_table(&std::fs::read(&features_path).unwrap()).unwrap();
    // 12 個有效音檔 + 1 個無標籤音檔；壞檔被略過
    assert_eq!(table.len(), 13);
    assert_eq!(table.feature_names.len(), 17);
    assert!(table.records.iter().all(|r| r.values.iter().all(|v| v.is_finite())));

    let pitches = table.column("mean_pitch_hz").unwrap();
    for (record, pitch) in table.records.iter().zip(&pitches) {
        assert!(*pitch > 100.0 && *pitch < 300.0, "{}: {}", record.filename, pitch);
    }

    // label
    EtlEngine::new(LabelPipeline::new(storage.clone(), settings.clone()))
        .run()
        .await
        .unwrap();
    let labeled =
        csv_io::read_labeled_table(&std::fs::read(temp_dir.path().join("features_labeled.csv")).unwrap())
            .unwrap();
    assert_eq!(labeled.shape(), (12, 19));
    assert_eq!(labeled.label_counts(), vec![(Label::Neutral, 6), (Label::Stressed, 6)]);
    for feature in &settings.labeling.plot_features {
        let plot = temp_dir.path().join("plots").join(format!("{}_boxplot.png", feature));
        assert!(plot.exists(), "missing {:?}", plot);
    }

    // preprocess
    EtlEngine::new(PreprocessPipeline::new(storage.clone(), settings.clone()))
        .run()
        .await
        .unwrap();
    let scaler = StandardScaler::from_json(&std::fs::read(temp_dir.path().join("scaler.json")).unwrap()).unwrap();
    assert_eq!(scaler.n_samples_seen, 12);
    assert_eq!(scaler.feature_names.len(), 17);
    assert!(temp_dir.path().join("processed_X.csv").exists());
    assert!(temp_dir.path().join("processed_y.csv").exists());

    // train
    let model_path = EtlEngine::new_with_monitoring(TrainPipeline::new(storage.clone(), settings.clone()), true)
        .run()
        .await
        .unwrap();
    let model =
        LogisticRegression::from_json(&std::fs::read(temp_dir.path().join(&model_path)).unwrap()).unwrap();
    assert_eq!(model.coefficients.len(), 17);
    assert!(temp_dir.path().join("plots/confusion_matrix.png").exists());

    let report: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("evaluation_report.json")).unwrap())
            .unwrap();
    // ceil(0.2 * 12) = 3
    assert_eq!(report["n_test"], 3);
    assert_eq!(report["n_train"], 9);
    let accuracy = report["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
}

#[tokio::test]
async fn test_missing_audio_directory() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = PipelineSettings::default();
    settings.paths.audio_dir = "does-not-exist".to_string();

    let engine = EtlEngine::new(ExtractPipeline::new(storage_for(&temp_dir), settings));
    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::MissingInputError { .. }));
    assert_eq!(err.category(), ErrorCategory::Input);
    assert!(!temp_dir.path().join("vocal_features.csv").exists());
}

#[tokio::test]
async fn test_stage_without_previous_output() {
    let temp_dir = TempDir::new().unwrap();
    let settings = PipelineSettings::default();

    let err = EtlEngine::new(TrainPipeline::new(storage_for(&temp_dir), settings))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::MissingInputError { .. }));
    assert!(!err.recovery_suggestion().is_empty());
}

#[tokio::test]
async fn test_toml_settings_redirect_outputs() {
    let temp_dir = TempDir::new().unwrap();
    seed_dataset(temp_dir.path());

    let config_path = temp_dir.path().join("pipeline.toml");
    std::fs::write(
        &config_path,
        r#"
[paths]
audio_dir = "dataset/Actor_03"
features_csv = "out/features.csv"

[extraction]
n_mfcc = 5
"#,
    )
    .unwrap();
    let settings = PipelineSettings::from_file(&config_path).unwrap();

    let output = EtlEngine::new(ExtractPipeline::new(storage_for(&temp_dir), settings))
        .run()
        .await
        .unwrap();
    assert_eq!(output, "out/features.csv");

    let table =
        csv_io::read_feature_table(&std::fs::read(temp_dir.path().join("out/features.csv")).unwrap()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.feature_names.len(), 9);
    assert_eq!(table.feature_names.last().map(String::as_str), Some("mfcc_5_mean"));
}
