use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs extract, transform and load; returns the primary output path.
    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting enrichment run");
        self.monitor.log_stats("Start");

        tracing::info!("Extracting address rows...");
        let addresses = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        tracing::info!("Enriching {} rows...", addresses.len());
        let result = self.pipeline.transform(addresses).await?;
        self.monitor.log_stats("Transform");

        tracing::info!(
            "Loading {} enriched rows ({} unresolved)...",
            result.enriched.len(),
            result.unresolved.len()
        );
        let output_path = self.pipeline.load(result).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!("Output saved to: {}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, TransformResult};
    use crate::domain::model::{EnrichedRow, ZipRecord};
    use crate::utils::error::EnrichError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPipeline {
        stages: AtomicUsize,
        fail_transform: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for CountingPipeline {
        async fn extract(&self) -> Result<Vec<Address>> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Address::new(Some("10001"), None, None)])
        }

        async fn transform(&self, data: Vec<Address>) -> Result<TransformResult> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            if self.fail_transform {
                return Err(EnrichError::processing("transform exploded"));
            }
            Ok(TransformResult {
                enriched: data
                    .into_iter()
                    .map(|a| EnrichedRow {
                        record: ZipRecord::empty(a.zip.unwrap_or_default()),
                        extra: a.extra,
                    })
                    .collect(),
                unresolved: Vec::new(),
            })
        }

        async fn load(&self, result: TransformResult) -> Result<String> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            Ok(format!("out/{}", result.enriched.len()))
        }
    }

    #[tokio::test]
    async fn test_run_executes_all_stages() {
        let engine = EtlEngine::new(CountingPipeline::default());
        let output = engine.run().await.unwrap();

        assert_eq!(output, "out/1");
        assert_eq!(engine.pipeline().stages.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_transform_error() {
        let engine = EtlEngine::new_with_monitoring(
            CountingPipeline {
                fail_transform: true,
                ..Default::default()
            },
            true,
        );

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EnrichError::ProcessingError { .. }));
        assert_eq!(engine.pipeline().stages.load(Ordering::SeqCst), 2);
    }
}
