use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forward throughput (kbps) below which a link is considered degraded
pub const DEGRADED_THRESHOLD: f64 = 1000.0;

/// Count sentinel meaning "no terminal data for this link"
pub const NO_DATA: i64 = -1;

/// One throughput observation of a satellite link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSample {
    pub link_id: String,
    pub forward_throughput: f64,
    pub return_throughput: f64,
    pub observed_at: DateTime<Utc>,
}

impl LinkSample {
    pub fn new(
        link_id: impl Into<String>,
        forward_throughput: f64,
        return_throughput: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            link_id: link_id.into(),
            forward_throughput,
            return_throughput,
            observed_at,
        }
    }

    /// Whether the forward throughput is strictly below the alert threshold
    pub fn is_degraded(&self) -> bool {
        self.forward_throughput < DEGRADED_THRESHOLD
    }
}

/// One signal-quality observation of a terminal attached to a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalRecord {
    pub link_id: String,
    pub terminal_id: String,
    pub observed_at: DateTime<Utc>,
    /// Average Es/No; `None` when the modem did not report
    pub signal_quality: Option<f64>,
}

impl TerminalRecord {
    /// A terminal is online iff its signal quality is strictly positive
    pub fn is_online(&self) -> bool {
        matches!(self.signal_quality, Some(q) if q > 0.0)
    }
}

/// Online/offline terminal counts for a link at its latest observation instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalStatusCount {
    pub link_id: String,
    pub online_count: i64,
    pub offline_count: i64,
}

impl TerminalStatusCount {
    /// Counts for a link that has never reported any terminal records
    pub fn no_data(link_id: impl Into<String>) -> Self {
        Self {
            link_id: link_id.into(),
            online_count: NO_DATA,
            offline_count: NO_DATA,
        }
    }

    pub fn has_data(&self) -> bool {
        self.online_count != NO_DATA && self.offline_count != NO_DATA
    }
}
