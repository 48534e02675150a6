use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, status, trigger_run, AppState};
use crate::alerts::RunOrchestrator;

/// Status server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/run", post(trigger_run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the status API until ctrl-c, then stop the orchestrator
pub async fn run_server(
    config: ServerConfig,
    orchestrator: Arc<RunOrchestrator>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        orchestrator: Arc::clone(&orchestrator),
    });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting status server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(orchestrator))
        .await?;

    tracing::info!("Status server stopped");
    Ok(())
}

async fn shutdown_signal(orchestrator: Arc<RunOrchestrator>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutdown signal received, stopping scheduler...");
    orchestrator.stop().await;
}
