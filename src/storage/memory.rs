//! In-process store backends
//!
//! Same query semantics as the Postgres stores, backed by plain vectors.
//! A terminal with a NaN signal quality counts as offline in both.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{LinkHealthStore, StoreError, TerminalStatusStore};
use crate::data::{LinkSample, TerminalRecord};

/// Link health samples held in memory
#[derive(Debug)]
pub struct MemoryLinkStore {
    samples: RwLock<Vec<LinkSample>>,
    connected: AtomicBool,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self {
            samples: RwLock::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    pub fn with_samples(samples: Vec<LinkSample>) -> Self {
        let store = Self::new();
        *store.samples.write() = samples;
        store
    }

    /// Simulate the connection going up or down
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for MemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest first; equal instants prefer the lower forward, then return throughput
fn sample_precedence(a: &LinkSample, b: &LinkSample) -> CmpOrdering {
    b.observed_at
        .cmp(&a.observed_at)
        .then_with(|| a.forward_throughput.total_cmp(&b.forward_throughput))
        .then_with(|| a.return_throughput.total_cmp(&b.return_throughput))
}

#[async_trait]
impl LinkHealthStore for MemoryLinkStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn latest_link_samples(&self) -> Result<Vec<LinkSample>, StoreError> {
        if !self.is_connected() {
            return Err(StoreError::Unavailable("memory store disconnected".to_string()));
        }

        let samples = self.samples.read();
        let mut latest: BTreeMap<&str, &LinkSample> = BTreeMap::new();

        for sample in samples.iter() {
            latest
                .entry(sample.link_id.as_str())
                .and_modify(|current| {
                    if sample_precedence(sample, current) == CmpOrdering::Less {
                        *current = sample;
                    }
                })
                .or_insert(sample);
        }

        Ok(latest.into_values().cloned().collect())
    }
}

/// Terminal signal-quality records held in memory
#[derive(Debug)]
pub struct MemoryTerminalStore {
    records: RwLock<Vec<TerminalRecord>>,
    connected: AtomicBool,
}

impl MemoryTerminalStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    pub fn with_records(records: Vec<TerminalRecord>) -> Self {
        let store = Self::new();
        *store.records.write() = records;
        store
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store disconnected".to_string()))
        }
    }

    fn count_where(&self, link_id: &str, pred: impl Fn(&TerminalRecord) -> bool) -> i64 {
        self.records
            .read()
            .iter()
            .filter(|r| r.link_id == link_id && pred(r))
            .count() as i64
    }
}

impl Default for MemoryTerminalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalStatusStore for MemoryTerminalStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn terminal_record_count(&self, link_id: &str) -> Result<i64, StoreError> {
        self.ensure_connected()?;
        Ok(self.count_where(link_id, |_| true))
    }

    async fn latest_observation(
        &self,
        link_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.ensure_connected()?;
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.link_id == link_id)
            .map(|r| r.observed_at)
            .max())
    }

    async fn count_online_at(&self, link_id: &str, at: DateTime<Utc>) -> Result<i64, StoreError> {
        self.ensure_connected()?;
        Ok(self.count_where(link_id, |r| r.observed_at == at && r.is_online()))
    }

    async fn count_offline_at(
        &self,
        link_id: &str,
        at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        self.ensure_connected()?;
        Ok(self.count_where(link_id, |r| r.observed_at == at && !r.is_online()))
    }
}
