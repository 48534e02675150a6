//! Read-only access to the per-gateway link health and terminal status stores

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::LinkSample;

pub use memory::{MemoryLinkStore, MemoryTerminalStore};
pub use postgres::{PgLinkStore, PgTerminalStore};

/// Throughput samples for every link at one gateway
#[async_trait]
pub trait LinkHealthStore: Send + Sync {
    /// Whether the underlying connection is usable
    fn is_connected(&self) -> bool;

    /// Most recent sample per link, ordered by link identifier
    async fn latest_link_samples(&self) -> Result<Vec<LinkSample>, StoreError>;
}

/// Signal-quality samples for every terminal at one gateway
#[async_trait]
pub trait TerminalStatusStore: Send + Sync {
    /// Whether the underlying connection is usable
    fn is_connected(&self) -> bool;

    /// Number of terminal records ever stored for the link
    async fn terminal_record_count(&self, link_id: &str) -> Result<i64, StoreError>;

    /// Latest observation instant for the link, if it has any records
    async fn latest_observation(&self, link_id: &str)
        -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Records at `at` with signal quality strictly above zero
    async fn count_online_at(&self, link_id: &str, at: DateTime<Utc>) -> Result<i64, StoreError>;

    /// Records at `at` with signal quality at or below zero, or missing
    async fn count_offline_at(&self, link_id: &str, at: DateTime<Utc>)
        -> Result<i64, StoreError>;
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_unavailable());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_unavailable());
    }
}
