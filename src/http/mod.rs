//! HTTP boundary
//!
//! # Routes
//!
//! - `POST /liveEvent` - Validate and append one event (shared-secret auth)
//! - `GET /userEvents/:user_id` - Current balance of one user
//! - `GET /` - Liveness

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::core::ingest::IngestionService;
use crate::core::traits::BalanceStore;
use crate::types::LedgerError;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state for the handlers
#[derive(Clone)]
pub struct AppState {
    pub ingestion: IngestionService,
    pub balances: Arc<dyn BalanceStore>,
    pub secret: Arc<str>,
}

impl AppState {
    pub fn new(
        ingestion: IngestionService,
        balances: Arc<dyn BalanceStore>,
        secret: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            ingestion,
            balances,
            secret: secret.into(),
        }
    }
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/liveEvent", post(handlers::live_event))
        .route("/userEvents/:user_id", get(handlers::user_events))
        .route("/", get(handlers::hello))
        .with_state(state)
}

/// Serve on `listener` until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), LedgerError> {
    let addr = listener.local_addr().map_err(|e| LedgerError::Server {
        message: e.to_string(),
    })?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LedgerError::Server {
            message: e.to_string(),
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
