use clap::Parser;
use vocal_stress::config::toml_config::PipelineSettings;
use vocal_stress::utils::error::{ErrorSeverity, Result};
use vocal_stress::utils::{logger, validation::Validate};
use vocal_stress::{
    CliConfig, EtlEngine, ExtractPipeline, LabelPipeline, LocalStorage, PreprocessPipeline, Stage,
    TrainPipeline,
};

async fn run_stage(
    stage: Stage,
    storage: &LocalStorage,
    settings: &PipelineSettings,
    monitor: bool,
) -> Result<Vec<String>> {
    let mut outputs = Vec::new();
    let run_all = stage == Stage::All;

    if run_all || stage == Stage::Extract {
        let pipeline = ExtractPipeline::new(storage.clone(), settings.clone());
        outputs.push(EtlEngine::new_with_monitoring(pipeline, monitor).run().await?);
    }
    if run_all || stage == Stage::Label {
        let pipeline = LabelPipeline::new(storage.clone(), settings.clone());
        outputs.push(EtlEngine::new_with_monitoring(pipeline, monitor).run().await?);
    }
    if run_all || stage == Stage::Preprocess {
        let pipeline = PreprocessPipeline::new(storage.clone(), settings.clone());
        outputs.push(EtlEngine::new_with_monitoring(pipeline, monitor).run().await?);
    }
    if run_all || stage == Stage::Train {
        let pipeline = TrainPipeline::new(storage.clone(), settings.clone());
        outputs.push(EtlEngine::new_with_monitoring(pipeline, monitor).run().await?);
    }

    Ok(outputs)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting vocal-stress CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 載入並驗證配置
    let settings = match config.settings().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.base_dir.clone());

    match run_stage(config.stage, &storage, &settings, config.monitor).await {
        Ok(outputs) => {
            tracing::info!("✅ Pipeline completed successfully!");
            for output in &outputs {
                println!("📁 Output saved to: {}", output);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Pipeline failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
