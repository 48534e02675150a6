//! Satwatch Server
//!
//! Run with: cargo run
//!
//! Configuration is read from the process environment, after loading
//! `SATWATCH_ENV_FILE` (default: local.env) if it exists:
//! - TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID: Alert destination (required)
//! - SATWATCH_SCHEDULE: Run interval, e.g. 30s, 5m, 1h (default: 5m)
//! - SATWATCH_GATEWAYS: LINK_PREFIX:TERMINAL_PREFIX pairs, comma separated
//! - <PREFIX>_HOST/_PORT/_USERNAME/_PASS/_NAME: Database per prefix
//! - SATWATCH_HOST / SATWATCH_PORT: Status API bind address (default: 0.0.0.0:8080)
//! - RUST_LOG: Log level (default: info)

use std::sync::Arc;

use satwatch::alerts::{Pipeline, ReportFormatter, RunOrchestrator, TelegramNotifier};
use satwatch::api::{run_server, ServerConfig};
use satwatch::config::AppConfig;
use satwatch::gateway::GatewayRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Satwatch configuration:");
    tracing::info!("  Status API: {}:{}", config.host, config.port);
    tracing::info!("  Schedule: every {:?}", config.schedule);
    tracing::info!("  Overlapping runs: {}", config.allow_overlap);
    tracing::info!("  Gateways: {}", config.gateways.len());
    for gateway in &config.gateways {
        tracing::info!("    - {} (terminals: {})", gateway.id, gateway.terminal_prefix);
    }

    let registry = Arc::new(GatewayRegistry::from_config(&config)?);
    let notifier = Arc::new(TelegramNotifier::from_config(&config.telegram)?);
    let formatter = ReportFormatter::new().with_mentions(config.mentions.clone());
    let pipeline = Pipeline::new(registry, formatter, notifier, &config.telegram.chat_id);

    let orchestrator =
        Arc::new(RunOrchestrator::new(Arc::new(pipeline)).with_overlap(config.allow_overlap));
    let scheduler = orchestrator.start(config.schedule);

    let server_config = ServerConfig {
        host: config.host.clone(),
        port: config.port,
    };
    run_server(server_config, Arc::clone(&orchestrator)).await?;

    scheduler.await?;
    tracing::info!("Satwatch stopped");
    Ok(())
}
