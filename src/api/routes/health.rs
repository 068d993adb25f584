//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{HealthResponse, RealtimeStats};
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// The alert hub is in-process, so the service can accept streams as soon
/// as it is listening. A detector outage only degrades classification.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let detector_ok = match state.detector.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Detection service health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if detector_ok { "healthy" } else { "degraded" }.to_string(),
        detector: if detector_ok { "ok" } else { "unavailable" }.to_string(),
        realtime: RealtimeStats {
            subscribers: state.hub.subscriber_count(),
            channels: state.hub.total_channels(),
        },
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
