//! # assignwise HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /process/{record_id}` - Stage classification of a work item
//! - `POST /suggest` - Rank candidates for a work item
//! - `POST /assign` - Commit an assignment against a previously returned pool
//! - `POST /proceed` - Handle a work item entering its next stage
//! - `POST /business-days` - Business days between two dates
//!
//! ## Status Codes
//!
//! | Error | Status |
//! |-------|--------|
//! | stale pool, item not in initial stage | 409 |
//! | no candidate, unknown record | 404 |
//! | invalid pick, unknown stage | 422 |
//! | store or counter failure | 502 |

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `assignwise::api::*`)
pub use handlers::{
    assign_handler, business_days_handler, health_handler, proceed_handler, process_handler,
    suggest_handler,
};
pub use types::{
    ApiError, AssignRequest, BusinessDaysRequest, BusinessDaysResponse, ErrorResponse,
    HealthResponse, ProceedRequest, ProcessResponse, SuggestRequest, SuggestResponse,
};

use crate::engine::AssignmentEngine;
use crate::store::WorkItemStore;
use assignwise_core::AssignwiseError;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MiB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the assignment engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AssignmentEngine<dyn WorkItemStore>>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: AssignmentEngine<dyn WorkItemStore>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/process/{record_id}", get(handlers::process_handler))
        .route("/suggest", post(handlers::suggest_handler))
        .route("/assign", post(handlers::assign_handler))
        .route("/proceed", post(handlers::proceed_handler))
        .route("/business-days", post(handlers::business_days_handler))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C.
pub async fn run_server(
    addr: &str,
    engine: AssignmentEngine<dyn WorkItemStore>,
) -> Result<(), AssignwiseError> {
    let router = create_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AssignwiseError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("assignwise HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AssignwiseError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
