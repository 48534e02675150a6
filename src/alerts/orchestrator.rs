//! Recurring fan-out of gateway runs

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use super::pipeline::{Pipeline, RunOutcome};

/// Run bookkeeping for one gateway
#[derive(Debug, Clone, Serialize)]
pub struct GatewayRunStatus {
    pub gateway_id: String,
    pub display_name: String,
    /// Runs currently executing
    pub in_flight: u32,
    /// Runs started since process start
    pub runs: u64,
    /// Ticks skipped because a run was still in flight
    pub skipped: u64,
    /// Last run start (unix millis)
    pub last_started: Option<i64>,
    /// Last run end (unix millis)
    pub last_finished: Option<i64>,
    pub last_outcome: Option<RunOutcome>,
}

impl GatewayRunStatus {
    fn new(gateway_id: &str, display_name: &str) -> Self {
        Self {
            gateway_id: gateway_id.to_string(),
            display_name: display_name.to_string(),
            in_flight: 0,
            runs: 0,
            skipped: 0,
            last_started: None,
            last_finished: None,
            last_outcome: None,
        }
    }
}

type StatusMap = Arc<DashMap<String, GatewayRunStatus>>;

/// Releases the in-flight slot even if the run panics
struct InFlightGuard {
    status: StatusMap,
    gateway_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(mut entry) = self.status.get_mut(&self.gateway_id) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
        }
    }
}

/// Fires every tick and runs each monitored gateway in its own task
pub struct RunOrchestrator {
    pipeline: Arc<Pipeline>,
    gateways: Vec<String>,
    allow_overlap: bool,
    status: StatusMap,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl RunOrchestrator {
    /// Create an orchestrator for every gateway in the pipeline's registry
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let status: StatusMap = Arc::new(DashMap::new());
        let gateways = pipeline.registry().ids();

        for gateway in pipeline.registry().iter() {
            status.insert(
                gateway.id().to_string(),
                GatewayRunStatus::new(gateway.id(), gateway.display_name()),
            );
        }

        Self {
            pipeline,
            gateways,
            allow_overlap: false,
            status,
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Let a new run start while the previous one for the same gateway is in flight
    pub fn with_overlap(mut self, allow: bool) -> Self {
        self.allow_overlap = allow;
        self
    }

    /// Status of every gateway, in configuration order
    pub fn statuses(&self) -> Vec<GatewayRunStatus> {
        self.gateways
            .iter()
            .filter_map(|id| self.status.get(id).map(|s| s.clone()))
            .collect()
    }

    /// Start the recurring schedule; the first tick fires immediately
    pub fn start(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                interval = ?every,
                gateways = orchestrator.gateways.len(),
                "Run orchestrator started"
            );
            let mut ticker = interval(every);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Runs are detached; a slow tick never delays the next one
                        orchestrator.tick();
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Run orchestrator shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop scheduling new ticks; in-flight runs finish on their own
    pub async fn stop(&self) {
        let tx = self.shutdown_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }

    /// Dispatch one run per gateway. `None` marks a skipped gateway.
    pub fn tick(&self) -> Vec<(String, Option<JoinHandle<RunOutcome>>)> {
        tracing::info!(gateways = self.gateways.len(), "Tick fired, dispatching gateway runs");

        self.gateways
            .iter()
            .map(|id| (id.clone(), self.dispatch(id)))
            .collect()
    }

    /// Run one tick and wait for every gateway to finish
    pub async fn run_now(&self) -> Vec<(String, RunOutcome)> {
        let dispatched = self.tick();
        let mut ids = Vec::with_capacity(dispatched.len());
        let mut pending = Vec::new();
        let mut outcomes = Vec::with_capacity(dispatched.len());

        for (id, handle) in dispatched {
            match handle {
                Some(handle) => {
                    ids.push(id);
                    pending.push(handle);
                }
                None => outcomes.push((id, RunOutcome::Skipped)),
            }
        }

        let joined = futures::future::join_all(pending).await;
        for (id, result) in ids.into_iter().zip(joined) {
            let outcome = result.unwrap_or_else(|e| RunOutcome::Failed {
                kind: "panicked".to_string(),
                error: e.to_string(),
            });
            outcomes.push((id, outcome));
        }

        outcomes
    }

    fn dispatch(&self, gateway_id: &str) -> Option<JoinHandle<RunOutcome>> {
        {
            let mut entry = self
                .status
                .entry(gateway_id.to_string())
                .or_insert_with(|| GatewayRunStatus::new(gateway_id, gateway_id));

            if entry.in_flight > 0 && !self.allow_overlap {
                entry.skipped += 1;
                tracing::warn!(
                    gateway = %gateway_id,
                    "Previous run still in progress, skipping this tick"
                );
                return None;
            }

            entry.in_flight += 1;
            entry.runs += 1;
            entry.last_started = Some(chrono::Utc::now().timestamp_millis());
        }

        let guard = InFlightGuard {
            status: Arc::clone(&self.status),
            gateway_id: gateway_id.to_string(),
        };
        let pipeline = Arc::clone(&self.pipeline);
        let status = Arc::clone(&self.status);
        let gateway_id = gateway_id.to_string();

        Some(tokio::spawn(async move {
            let _guard = guard;
            tracing::info!(gateway = %gateway_id, "Gateway run started");

            let outcome = match pipeline.run_gateway(&gateway_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        gateway = %gateway_id,
                        kind = e.kind(),
                        error = %e,
                        "Gateway run failed"
                    );
                    RunOutcome::from(&e)
                }
            };

            if let Some(mut entry) = status.get_mut(&gateway_id) {
                entry.last_finished = Some(chrono::Utc::now().timestamp_millis());
                entry.last_outcome = Some(outcome.clone());
            }

            outcome
        }))
    }
}
