//! Axum HTTP server for the REST API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::error::{Error, Result};
use crate::ledger::LedgerAdapter;

/// Routes served by the API
pub fn router(adapter: Arc<LedgerAdapter>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/files", post(handlers::upload_files))
        .route(
            "/api/v1/records",
            get(handlers::list_records).post(handlers::append_record),
        )
        .route("/api/v1/accounts", get(handlers::list_accounts))
        // Uploads have no size cap.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(adapter)
}

/// Run the REST API server
pub async fn run_server(adapter: Arc<LedgerAdapter>, addr: SocketAddr) -> Result<()> {
    let app = router(adapter);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ConfigError(format!("Server error: {}", e)))?;

    Ok(())
}
