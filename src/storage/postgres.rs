//! Postgres-backed stores
//!
//! Pools are created lazily: a database that is down at startup is simply
//! retried on the next tick instead of being dropped from the run.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use super::{LinkHealthStore, StoreError, TerminalStatusStore};
use crate::config::DatabaseConfig;
use crate::data::LinkSample;

const LATEST_LINK_SAMPLES: &str = r#"
    SELECT DISTINCT ON (satnet_name)
        satnet_name AS link_id,
        satnet_fwd_throughput::float8 AS forward_throughput,
        satnet_rtn_throughput::float8 AS return_throughput,
        updated_at::timestamptz AS observed_at
    FROM satnets
    ORDER BY satnet_name, updated_at DESC, satnet_fwd_throughput ASC, satnet_rtn_throughput ASC
"#;

const TERMINAL_RECORD_COUNT: &str = "SELECT COUNT(*) FROM modem_kpi WHERE satnet = $1";

const LATEST_OBSERVATION: &str =
    "SELECT MAX(time)::timestamptz FROM modem_kpi WHERE satnet = $1";

// Postgres sorts NaN above every number, so it has to be excluded explicitly
const ONLINE_AT: &str = "SELECT COUNT(*) FROM modem_kpi \
     WHERE satnet = $1 AND time = $2 AND esno_avg > 0 AND esno_avg <> 'NaN'";

const OFFLINE_AT: &str = "SELECT COUNT(*) FROM modem_kpi \
     WHERE satnet = $1 AND time = $2 \
     AND (esno_avg <= 0 OR esno_avg IS NULL OR esno_avg = 'NaN')";

/// Build a lazily connecting pool for one configured database
pub fn connect_lazy(config: &DatabaseConfig, max_connections: u32) -> PgPool {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.name)
        .ssl_mode(PgSslMode::Prefer);

    if let Some(ref password) = config.password {
        options = options.password(password);
    }

    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options)
}

#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    link_id: String,
    forward_throughput: f64,
    return_throughput: f64,
    observed_at: DateTime<Utc>,
}

impl From<LinkRow> for LinkSample {
    fn from(row: LinkRow) -> Self {
        LinkSample {
            link_id: row.link_id,
            forward_throughput: row.forward_throughput,
            return_throughput: row.return_throughput,
            observed_at: row.observed_at,
        }
    }
}

/// Link health store reading the `satnets` table
#[derive(Debug, Clone)]
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkHealthStore for PgLinkStore {
    fn is_connected(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn latest_link_samples(&self) -> Result<Vec<LinkSample>, StoreError> {
        let rows: Vec<LinkRow> = sqlx::query_as(LATEST_LINK_SAMPLES)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LinkSample::from).collect())
    }
}

/// Terminal status store reading the `modem_kpi` table
#[derive(Debug, Clone)]
pub struct PgTerminalStore {
    pool: PgPool,
}

impl PgTerminalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TerminalStatusStore for PgTerminalStore {
    fn is_connected(&self) -> bool {
        !self.pool.is_closed()
    }

    async fn terminal_record_count(&self, link_id: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(TERMINAL_RECORD_COUNT)
            .bind(link_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn latest_observation(
        &self,
        link_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(LATEST_OBSERVATION)
            .bind(link_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(latest)
    }

    async fn count_online_at(&self, link_id: &str, at: DateTime<Utc>) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(ONLINE_AT)
            .bind(link_id)
            .bind(at)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_offline_at(
        &self,
        link_id: &str,
        at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(OFFLINE_AT)
            .bind(link_id)
            .bind(at)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
