//! Per-gateway report compilation

use std::sync::Arc;

use super::aggregator::TerminalStatusAggregator;
use super::detector::DegradationDetector;
use super::error::PipelineError;
use crate::data::{GatewayReport, LinkReport};
use crate::gateway::GatewayRegistry;

/// Runs detection, then terminal aggregation for each degraded link
#[derive(Debug, Clone)]
pub struct ReportCompiler {
    registry: Arc<GatewayRegistry>,
    detector: DegradationDetector,
    aggregator: TerminalStatusAggregator,
}

impl ReportCompiler {
    pub fn new(registry: Arc<GatewayRegistry>) -> Self {
        Self {
            detector: DegradationDetector::new(Arc::clone(&registry)),
            aggregator: TerminalStatusAggregator::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// Build the report for one gateway.
    ///
    /// Detection failures fail the whole report. A failed terminal lookup only
    /// leaves that link's counts empty.
    pub async fn compile(&self, gateway_id: &str) -> Result<GatewayReport, PipelineError> {
        let gateway = self.registry.resolve(gateway_id)?;
        let degraded = self.detector.detect(gateway_id).await?;

        let mut report = GatewayReport::new(gateway.id(), gateway.display_name());
        report.links.reserve(degraded.len());

        for sample in degraded {
            let counts = match self.aggregator.aggregate(gateway_id, &sample.link_id).await {
                Ok(counts) => Some(counts),
                Err(e) => {
                    tracing::warn!(
                        gateway = %gateway_id,
                        link_id = %sample.link_id,
                        error = %e,
                        "Terminal status unavailable, reporting link without counts"
                    );
                    None
                }
            };
            report.links.push(LinkReport::from_sample(sample, counts));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LinkSample, TerminalRecord};
    use crate::gateway::Gateway;
    use crate::storage::{MemoryLinkStore, MemoryTerminalStore};
    use chrono::{TimeZone, Utc};

    fn gateway(
        links: Arc<MemoryLinkStore>,
        terminals: Arc<MemoryTerminalStore>,
    ) -> Arc<GatewayRegistry> {
        let mut registry = GatewayRegistry::new();
        registry
            .register(
                Gateway::new("DB_ONE_JYP", "JAYAPURA")
                    .with_link_store(links)
                    .with_terminal_store(terminals),
            )
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_joins_links_with_counts() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let links = Arc::new(MemoryLinkStore::with_samples(vec![
            LinkSample::new("L1", 500.0, 80.0, at),
            LinkSample::new("L2", 5000.0, 80.0, at),
            LinkSample::new("L3", 10.0, 1.0, at),
        ]));
        let terminals = Arc::new(MemoryTerminalStore::with_records(vec![TerminalRecord {
            link_id: "L1".to_string(),
            terminal_id: "T1".to_string(),
            observed_at: at,
            signal_quality: Some(6.0),
        }]));

        let compiler = ReportCompiler::new(gateway(links, terminals));
        let report = compiler.compile("DB_ONE_JYP").await.unwrap();

        assert_eq!(report.gateway_display_name, "JAYAPURA");
        assert_eq!(report.links.len(), 2);
        assert_eq!(report.links[0].link_id, "L1");
        assert_eq!(report.links[0].online_count, Some(1));
        assert_eq!(report.links[0].offline_count, Some(0));
        // No terminal records at all: sentinel passes through
        assert_eq!(report.links[1].link_id, "L3");
        assert_eq!(report.links[1].online_count, Some(-1));
        assert_eq!(report.links[1].offline_count, Some(-1));
    }

    #[tokio::test]
    async fn test_aggregation_failure_is_not_fatal() {
        let links = Arc::new(MemoryLinkStore::with_samples(vec![LinkSample::new(
            "L1",
            500.0,
            80.0,
            Utc::now(),
        )]));
        let terminals = Arc::new(MemoryTerminalStore::new());
        terminals.set_connected(false);

        let compiler = ReportCompiler::new(gateway(links, terminals));
        let report = compiler.compile("DB_ONE_JYP").await.unwrap();

        assert_eq!(report.links.len(), 1);
        assert_eq!(report.links[0].online_count, None);
        assert_eq!(report.links[0].offline_count, None);
    }

    #[tokio::test]
    async fn test_detection_failure_fails_report() {
        let links = Arc::new(MemoryLinkStore::new());
        links.set_connected(false);

        let compiler = ReportCompiler::new(gateway(links, Arc::new(MemoryTerminalStore::new())));
        let err = compiler.compile("DB_ONE_JYP").await.unwrap_err();
        assert!(matches!(err, PipelineError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_healthy_gateway_gives_empty_report() {
        let links = Arc::new(MemoryLinkStore::with_samples(vec![LinkSample::new(
            "L1",
            2000.0,
            80.0,
            Utc::now(),
        )]));

        let compiler = ReportCompiler::new(gateway(links, Arc::new(MemoryTerminalStore::new())));
        let report = compiler.compile("DB_ONE_JYP").await.unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.gateway_id, "DB_ONE_JYP");
    }
}
