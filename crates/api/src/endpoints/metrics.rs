//! Metrics endpoints for monitoring and observability.
//!
//! Provides endpoints for:
//! - JSON and Prometheus counter export
//! - Liveness and readiness probes

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use liveclass_common::metrics::{MetricsSnapshot, get_metrics};
use serde::Serialize;

use crate::middleware::AppState;

/// Create the metrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_metrics_json))
        .route("/prometheus", get(get_metrics_prometheus))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

/// JSON metrics response.
#[derive(Serialize)]
pub struct MetricsResponse {
    pub lifecycle: LifecycleMetrics,
    pub admission: AdmissionMetrics,
    pub artifacts: ArtifactMetrics,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleMetrics {
    pub created: u64,
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionMetrics {
    pub admitted: u64,
    pub reconnected: u64,
    pub rejected_not_joinable: u64,
    pub rejected_capacity: u64,
    pub rejected_device: u64,
    pub leaves: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetrics {
    pub polls_created: u64,
    pub poll_responses: u64,
    pub messages: u64,
    pub whiteboard_saves: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            lifecycle: LifecycleMetrics {
                created: s.sessions_created,
                started: s.sessions_started,
                completed: s.sessions_completed,
                cancelled: s.sessions_cancelled,
            },
            admission: AdmissionMetrics {
                admitted: s.joins_admitted,
                reconnected: s.joins_reconnected,
                rejected_not_joinable: s.joins_rejected_not_joinable,
                rejected_capacity: s.joins_rejected_capacity,
                rejected_device: s.joins_rejected_device,
                leaves: s.leaves_total,
            },
            artifacts: ArtifactMetrics {
                polls_created: s.polls_created,
                poll_responses: s.poll_responses,
                messages: s.messages_recorded,
                whiteboard_saves: s.whiteboard_saves,
            },
        }
    }
}

/// Get metrics in JSON format.
async fn get_metrics_json() -> Json<MetricsResponse> {
    let snapshot = get_metrics().snapshot();
    Json(MetricsResponse::from(snapshot))
}

/// Get metrics in Prometheus text format.
async fn get_metrics_prometheus() -> Response {
    let prometheus_output = get_metrics().to_prometheus();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        prometheus_output,
    )
        .into_response()
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Simple health check (liveness probe).
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: CheckResult,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// Readiness check (readiness probe).
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let start = std::time::Instant::now();

    let database = match state.db.ping().await {
        Ok(()) => CheckResult {
            status: "ok".to_string(),
            latency_ms: Some(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            CheckResult {
                status: format!("error: {e}"),
                latency_ms: None,
            }
        }
    };

    let ready = database.status == "ok";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, database }))
}
