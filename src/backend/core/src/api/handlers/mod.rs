//! Request handlers, grouped by resource.

pub mod access;
pub mod auth;
pub mod permissions;
pub mod plans;
pub mod users;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::warn;

use super::AppState;
use crate::error::{Result, TollboothError};
use crate::store::bounded;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, storage) = match bounded(state.storage_timeout, state.store.ping()).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            warn!(error = %err, "Health check could not reach storage");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let label = if status == StatusCode::OK { "healthy" } else { "degraded" };
    (
        status,
        Json(serde_json::json!({
            "status": label,
            "storage": storage,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.render(),
    )
}

/// Reject service names outside the configured vocabulary.
fn ensure_known_service(state: &AppState, service: &str) -> Result<()> {
    if state.services.contains(service) {
        Ok(())
    } else {
        Err(TollboothError::service_not_found(service))
    }
}
