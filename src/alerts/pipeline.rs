//! One gateway's compile → format → deliver chain

use std::sync::Arc;

use serde::Serialize;

use super::compiler::ReportCompiler;
use super::error::PipelineError;
use super::formatter::ReportFormatter;
use super::notifier::Notifier;
use crate::gateway::GatewayRegistry;

/// Result of one gateway run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No degraded links; nothing was sent
    Healthy,
    /// An alert listing this many degraded links was delivered
    Alerted { degraded_links: usize },
    /// The previous run for this gateway was still in flight
    Skipped,
    /// The run stopped at an error
    Failed { kind: String, error: String },
}

impl From<&PipelineError> for RunOutcome {
    fn from(err: &PipelineError) -> Self {
        RunOutcome::Failed {
            kind: err.kind().to_string(),
            error: err.to_string(),
        }
    }
}

/// Everything needed to run one gateway end to end
pub struct Pipeline {
    registry: Arc<GatewayRegistry>,
    compiler: ReportCompiler,
    formatter: ReportFormatter,
    notifier: Arc<dyn Notifier>,
    channel_id: String,
}

impl Pipeline {
    pub fn new(
        registry: Arc<GatewayRegistry>,
        formatter: ReportFormatter,
        notifier: Arc<dyn Notifier>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            compiler: ReportCompiler::new(Arc::clone(&registry)),
            registry,
            formatter,
            notifier,
            channel_id: channel_id.into(),
        }
    }

    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    /// Compile the gateway's report and deliver an alert if anything is degraded
    pub async fn run_gateway(&self, gateway_id: &str) -> Result<RunOutcome, PipelineError> {
        let report = self.compiler.compile(gateway_id).await?;

        let Some(message) = self.formatter.format(&report) else {
            tracing::info!(
                gateway = %gateway_id,
                display_name = %report.gateway_display_name,
                "No degraded links, nothing to report"
            );
            return Ok(RunOutcome::Healthy);
        };

        let degraded_links = report.links.len();
        tracing::info!(
            gateway = %gateway_id,
            display_name = %report.gateway_display_name,
            degraded_links,
            "Report formatted, sending alert"
        );

        self.notifier.deliver(&self.channel_id, &message).await?;

        tracing::info!(gateway = %gateway_id, degraded_links, "Alert delivered");
        Ok(RunOutcome::Alerted { degraded_links })
    }
}
