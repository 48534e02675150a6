//! Gateway health alert pipeline
//!
//! Detects degraded links, counts the terminals behind them, renders one
//! alert per gateway and delivers it, for every gateway on every tick.

pub mod aggregator;
pub mod compiler;
pub mod detector;
pub mod error;
pub mod formatter;
pub mod notifier;
pub mod orchestrator;
pub mod pipeline;

pub use aggregator::TerminalStatusAggregator;
pub use compiler::ReportCompiler;
pub use detector::DegradationDetector;
pub use error::{PipelineError, StoreKind};
pub use formatter::{escape_markdown, ReportFormatter};
pub use notifier::{Notifier, TelegramNotifier};
pub use orchestrator::{GatewayRunStatus, RunOrchestrator};
pub use pipeline::{Pipeline, RunOutcome};
