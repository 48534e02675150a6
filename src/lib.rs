//! Satwatch: Satellite Gateway Health Alerts
//!
//! Periodically inspects the satellite links ("satnets") behind each monitored
//! ground gateway, flags links whose forward throughput has dropped below
//! [`data::DEGRADED_THRESHOLD`], counts online/offline terminals on each
//! degraded link, and posts a MarkdownV2 alert to a Telegram channel.
//!
//! # Pipeline
//!
//! - **Detection**: latest sample per link, filtered by forward throughput
//! - **Aggregation**: terminal online/offline counts at the latest snapshot
//! - **Compilation**: one [`data::GatewayReport`] per gateway
//! - **Formatting**: escaped MarkdownV2 alert text, or nothing when healthy
//! - **Delivery**: one `sendMessage` call per alert
//! - **Orchestration**: every gateway runs in its own task on each tick
//!
//! # Example
//!
//! ```no_run
//! use satwatch::alerts::{Pipeline, ReportFormatter, RunOrchestrator, TelegramNotifier};
//! use satwatch::config::AppConfig;
//! use satwatch::gateway::GatewayRegistry;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let registry = Arc::new(GatewayRegistry::from_config(&config)?);
//! let notifier = Arc::new(TelegramNotifier::from_config(&config.telegram)?);
//! let pipeline = Pipeline::new(registry, ReportFormatter::new(), notifier, &config.telegram.chat_id);
//!
//! let orchestrator = RunOrchestrator::new(Arc::new(pipeline));
//! for (gateway, outcome) in orchestrator.run_now().await {
//!     println!("{gateway}: {outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod data;
pub mod gateway;
pub mod storage;

// Re-export commonly used types
pub use alerts::{Pipeline, PipelineError, RunOrchestrator, RunOutcome};
pub use config::{AppConfig, ConfigError};
pub use data::{GatewayReport, LinkReport, LinkSample};
pub use gateway::{Gateway, GatewayRegistry};
pub use storage::StoreError;
