//! Per-gateway alert report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::{LinkSample, TerminalStatusCount};

/// Structured result of one pipeline run for one gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayReport {
    /// Raw gateway identifier
    pub gateway_id: String,
    /// Human-friendly gateway name
    pub gateway_display_name: String,
    /// Degraded links, in detector order
    #[serde(default)]
    pub links: Vec<LinkReport>,
}

impl GatewayReport {
    pub fn new(gateway_id: impl Into<String>, gateway_display_name: impl Into<String>) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            gateway_display_name: gateway_display_name.into(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: LinkReport) -> Self {
        self.links.push(link);
        self
    }

    /// A report without degraded links means the gateway is healthy
    pub fn is_healthy(&self) -> bool {
        self.links.is_empty()
    }
}

/// A degraded link joined with its terminal counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub link_id: String,
    pub forward_throughput: f64,
    pub return_throughput: f64,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    pub observed_at: Option<DateTime<Utc>>,
    pub online_count: Option<i64>,
    pub offline_count: Option<i64>,
}

impl LinkReport {
    /// Join a degraded sample with its counts; `None` marks a failed lookup
    pub fn from_sample(sample: LinkSample, counts: Option<TerminalStatusCount>) -> Self {
        let (online_count, offline_count) = match counts {
            Some(c) => (Some(c.online_count), Some(c.offline_count)),
            None => (None, None),
        };

        Self {
            link_id: sample.link_id,
            forward_throughput: sample.forward_throughput,
            return_throughput: sample.return_throughput,
            observed_at: Some(sample.observed_at),
            online_count,
            offline_count,
        }
    }
}

/// Accepts RFC 3339 strings and treats anything unparsable as absent
mod lenient_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| {
            DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc))
        }))
    }
}
