use crate::storage::StoreError;

/// Which of a gateway's two stores an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    LinkHealth,
    TerminalStatus,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::LinkHealth => write!(f, "link health"),
            StoreKind::TerminalStatus => write!(f, "terminal status"),
        }
    }
}

/// Alert pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Unknown gateway: {0}")]
    UnknownGateway(String),

    #[error("{store} store unavailable for gateway {gateway}: {reason}")]
    StoreUnavailable {
        gateway: String,
        store: StoreKind,
        reason: String,
    },

    #[error("Link health query failed for gateway {gateway}: {source}")]
    Query {
        gateway: String,
        #[source]
        source: StoreError,
    },

    #[error("Terminal status aggregation failed for link {link_id}: {source}")]
    AggregationFailed {
        link_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Delivery failed (status {}): {body}", status_text(.status))]
    DeliveryFailed { status: Option<u16>, body: String },
}

fn status_text(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl PipelineError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::UnknownGateway(_) => "unknown_gateway",
            PipelineError::StoreUnavailable { .. } => "store_unavailable",
            PipelineError::Query { .. } => "query_failed",
            PipelineError::AggregationFailed { .. } => "aggregation_failed",
            PipelineError::DeliveryFailed { .. } => "delivery_failed",
        }
    }
}
