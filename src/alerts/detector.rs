//! Degraded link detection

use std::sync::Arc;

use super::error::{PipelineError, StoreKind};
use crate::data::LinkSample;
use crate::gateway::GatewayRegistry;
use crate::storage::StoreError;

/// Finds links whose latest forward throughput is below the alert threshold
#[derive(Debug, Clone)]
pub struct DegradationDetector {
    registry: Arc<GatewayRegistry>,
}

impl DegradationDetector {
    pub fn new(registry: Arc<GatewayRegistry>) -> Self {
        Self { registry }
    }

    /// Latest sample of every degraded link at the gateway, in store order.
    ///
    /// An empty result means the gateway is healthy.
    pub async fn detect(&self, gateway_id: &str) -> Result<Vec<LinkSample>, PipelineError> {
        let gateway = self.registry.resolve(gateway_id)?;
        let store = gateway.link_store()?;

        let samples = store
            .latest_link_samples()
            .await
            .map_err(|e| match e {
                StoreError::Unavailable(reason) => PipelineError::StoreUnavailable {
                    gateway: gateway_id.to_string(),
                    store: StoreKind::LinkHealth,
                    reason,
                },
                other => PipelineError::Query {
                    gateway: gateway_id.to_string(),
                    source: other,
                },
            })?;

        let total = samples.len();
        let degraded: Vec<LinkSample> = samples.into_iter().filter(LinkSample::is_degraded).collect();

        tracing::debug!(
            gateway = %gateway_id,
            links = total,
            degraded = degraded.len(),
            "Link health checked"
        );

        Ok(degraded)
    }
}
