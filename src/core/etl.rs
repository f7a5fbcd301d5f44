use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::{RunMonitor, RunSummary};

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.monitor.summary()
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting ETL process...");

        // Extract
        self.monitor.start_phase();
        let items = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} items", items.len());
        self.monitor.finish_phase("extract");

        // Transform
        self.monitor.start_phase();
        let result = self.pipeline.transform(items).await?;
        tracing::info!(
            "🔄 Transformed {} items ({} skipped)",
            result.processed.len(),
            result.skipped.len()
        );
        self.monitor.finish_phase("transform");

        // Load
        self.monitor.start_phase();
        let output = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to: {}", output);
        self.monitor.finish_phase("load");

        self.monitor.log_final_stats();
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransformResult;
    use crate::utils::error::ListingError;
    use async_trait::async_trait;

    struct CountingPipeline {
        fail_load: bool,
    }

    #[async_trait]
    impl Pipeline for CountingPipeline {
        type Item = u32;
        type Output = u32;

        async fn extract(&self) -> Result<Vec<u32>> {
            Ok(vec![1, 2, 3, 4])
        }

        async fn transform(&self, data: Vec<u32>) -> Result<TransformResult<u32>> {
            let mut result = TransformResult::new();
            for n in data {
                if n % 2 == 0 {
                    result.processed.push(n * 10);
                } else {
                    result.skip(n as usize, "odd");
                }
            }
            Ok(result)
        }

        async fn load(&self, result: TransformResult<u32>) -> Result<String> {
            if self.fail_load {
                return Err(ListingError::ProcessingError {
                    message: "load failed".to_string(),
                });
            }
            Ok(format!("{:?}/{}", result.processed, result.skipped.len()))
        }
    }

    #[tokio::test]
    async fn test_run_drives_all_phases() {
        let engine = EtlEngine::new_with_monitoring(CountingPipeline { fail_load: false }, true);
        let output = engine.run().await.unwrap();
        assert_eq!(output, "[20, 40]/2");

        let summary = engine.summary().unwrap();
        assert_eq!(summary.phases.len(), 3);
    }

    #[tokio::test]
    async fn test_run_propagates_load_error() {
        let engine = EtlEngine::new(CountingPipeline { fail_load: true });
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, ListingError::ProcessingError { .. }));
        assert!(engine.summary().is_none());
    }
}
