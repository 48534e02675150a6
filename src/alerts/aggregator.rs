//! Terminal online/offline counts per link

use std::sync::Arc;

use super::error::PipelineError;
use crate::data::TerminalStatusCount;
use crate::gateway::GatewayRegistry;
use crate::storage::StoreError;

/// Counts online and offline terminals of a link at its latest observation
#[derive(Debug, Clone)]
pub struct TerminalStatusAggregator {
    registry: Arc<GatewayRegistry>,
}

impl TerminalStatusAggregator {
    pub fn new(registry: Arc<GatewayRegistry>) -> Self {
        Self { registry }
    }

    /// Terminal counts for `link_id`.
    ///
    /// A link that never reported any terminal returns the `-1`/`-1` sentinel.
    /// Both counts are taken at the same snapshot instant.
    pub async fn aggregate(
        &self,
        gateway_id: &str,
        link_id: &str,
    ) -> Result<TerminalStatusCount, PipelineError> {
        let gateway = self.registry.resolve(gateway_id)?;
        let store = gateway.terminal_store()?;

        let failed = |source: StoreError| PipelineError::AggregationFailed {
            link_id: link_id.to_string(),
            source,
        };

        let total = store.terminal_record_count(link_id).await.map_err(failed)?;
        if total == 0 {
            return Ok(TerminalStatusCount::no_data(link_id));
        }

        // Records may vanish between the two queries
        let Some(snapshot) = store.latest_observation(link_id).await.map_err(failed)? else {
            return Ok(TerminalStatusCount::no_data(link_id));
        };

        let online_count = store
            .count_online_at(link_id, snapshot)
            .await
            .map_err(failed)?;
        let offline_count = store
            .count_offline_at(link_id, snapshot)
            .await
            .map_err(failed)?;

        tracing::debug!(
            gateway = %gateway_id,
            link_id = %link_id,
            %snapshot,
            online_count,
            offline_count,
            "Terminal status aggregated"
        );

        Ok(TerminalStatusCount {
            link_id: link_id.to_string(),
            online_count,
            offline_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::StoreKind;
    use crate::data::TerminalRecord;
    use crate::gateway::Gateway;
    use crate::storage::{MemoryTerminalStore, TerminalStatusStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn registry_with(store: Arc<dyn TerminalStatusStore>) -> Arc<GatewayRegistry> {
        let mut registry = GatewayRegistry::new();
        registry
            .register(Gateway::new("A", "A").with_terminal_store(store))
            .unwrap();
        Arc::new(registry)
    }

    fn record(terminal: usize, at: DateTime<Utc>, quality: Option<f64>) -> TerminalRecord {
        TerminalRecord {
            link_id: "L1".to_string(),
            terminal_id: format!("T{}", terminal),
            observed_at: at,
            signal_quality: quality,
        }
    }

    #[tokio::test]
    async fn test_counts_at_latest_instant_only() {
        let latest = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        let older = latest - Duration::minutes(15);

        let mut records = Vec::new();
        for i in 0..7 {
            records.push(record(i, latest, Some(2.5)));
        }
        for i in 7..10 {
            records.push(record(i, latest, Some(-1.0)));
        }
        // Older snapshot must not leak into the counts
        for i in 0..10 {
            records.push(record(i, older, Some(4.0)));
        }

        let aggregator = TerminalStatusAggregator::new(registry_with(Arc::new(
            MemoryTerminalStore::with_records(records),
        )));

        let counts = aggregator.aggregate("A", "L1").await.unwrap();
        assert_eq!(counts.online_count, 7);
        assert_eq!(counts.offline_count, 3);
    }

    #[tokio::test]
    async fn test_null_quality_counts_offline() {
        let at = Utc::now();
        let store = MemoryTerminalStore::with_records(vec![
            record(0, at, None),
            record(1, at, Some(0.0)),
            record(2, at, Some(0.1)),
        ]);

        let aggregator = TerminalStatusAggregator::new(registry_with(Arc::new(store)));
        let counts = aggregator.aggregate("A", "L1").await.unwrap();
        assert_eq!((counts.online_count, counts.offline_count), (1, 2));
    }

    #[tokio::test]
    async fn test_no_records_returns_sentinel() {
        let aggregator =
            TerminalStatusAggregator::new(registry_with(Arc::new(MemoryTerminalStore::new())));

        let counts = aggregator.aggregate("A", "L9").await.unwrap();
        assert_eq!(counts, TerminalStatusCount::no_data("L9"));
    }

    #[tokio::test]
    async fn test_all_offline_is_not_sentinel() {
        let at = Utc::now();
        let store = MemoryTerminalStore::with_records(vec![record(0, at, None), record(1, at, None)]);

        let aggregator = TerminalStatusAggregator::new(registry_with(Arc::new(store)));
        let counts = aggregator.aggregate("A", "L1").await.unwrap();
        assert_eq!((counts.online_count, counts.offline_count), (0, 2));
        assert!(counts.has_data());
    }

    struct BrokenStore;

    #[async_trait]
    impl TerminalStatusStore for BrokenStore {
        fn is_connected(&self) -> bool {
            true
        }

        async fn terminal_record_count(&self, _link_id: &str) -> Result<i64, StoreError> {
            Ok(4)
        }

        async fn latest_observation(
            &self,
            _link_id: &str,
        ) -> Result<Option<DateTime<Utc>>, StoreError> {
            Err(StoreError::Query("relation \"modem_kpi\" does not exist".to_string()))
        }

        async fn count_online_at(&self, _: &str, _: DateTime<Utc>) -> Result<i64, StoreError> {
            unreachable!()
        }

        async fn count_offline_at(&self, _: &str, _: DateTime<Utc>) -> Result<i64, StoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_query_failure_carries_link_id() {
        let aggregator = TerminalStatusAggregator::new(registry_with(Arc::new(BrokenStore)));

        let err = aggregator.aggregate("A", "JYPN1-B001-SN01").await.unwrap_err();
        match err {
            PipelineError::AggregationFailed { link_id, .. } => {
                assert_eq!(link_id, "JYPN1-B001-SN01")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_disconnected_store() {
        let store = Arc::new(MemoryTerminalStore::new());
        store.set_connected(false);

        let aggregator = TerminalStatusAggregator::new(registry_with(store));
        let err = aggregator.aggregate("A", "L1").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StoreUnavailable { store: StoreKind::TerminalStatus, .. }
        ));
    }
}
