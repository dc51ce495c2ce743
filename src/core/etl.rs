use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: StageMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: StageMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: StageMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs extract → transform → load and returns the primary output path.
    pub async fn run(&self) -> Result<String> {
        let stage = self.pipeline.name();
        let started = Instant::now();
        tracing::info!("🚀 Starting {} stage", stage);

        tracing::debug!("📥 {}: extract", stage);
        let extracted = self.pipeline.extract().await?;
        self.monitor.log_phase(stage, "extract");

        tracing::debug!("🔄 {}: transform", stage);
        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.log_phase(stage, "transform");

        tracing::debug!("💾 {}: load", stage);
        let output_path = self.pipeline.load(transformed).await?;
        self.monitor.log_phase(stage, "load");

        self.monitor.log_final(stage);
        tracing::info!(
            "✅ {} stage finished in {:.2?}, output: {}",
            stage,
            started.elapsed(),
            output_path
        );

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::PipelineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPipeline {
        calls: AtomicUsize,
        fail_transform: bool,
    }

    #[async_trait]
    impl Pipeline for CountingPipeline {
        type Extracted = Vec<u32>;
        type Transformed = u32;

        fn name(&self) -> &'static str {
            "counting"
        }

        async fn extract(&self) -> Result<Vec<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        }

        async fn transform(&self, data: Vec<u32>) -> Result<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_transform {
                return Err(PipelineError::processing("boom"));
            }
            Ok(data.iter().sum())
        }

        async fn load(&self, result: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sum={}", result))
        }
    }

    #[tokio::test]
    async fn test_runs_all_phases_in_order() {
        let engine = EtlEngine::new_with_monitoring(
            CountingPipeline {
                calls: AtomicUsize::new(0),
                fail_transform: false,
            },
            true,
        );
        let output = engine.run().await.unwrap();
        assert_eq!(output, "sum=6");
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_on_error() {
        let engine = EtlEngine::new(CountingPipeline {
            calls: AtomicUsize::new(0),
            fail_transform: true,
        });
        assert!(engine.run().await.is_err());
        // load 不會被呼叫
        assert_eq!(engine.pipeline().calls.load(Ordering::SeqCst), 2);
    }
}
