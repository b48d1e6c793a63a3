//! Room endpoints, called by the signaling layer on connect and disconnect.

use axum::{Json, Router, extract::State, routing::post};
use liveclass_common::AppResult;
use liveclass_core::{Admission, DeviceCapabilities};
use serde::{Deserialize, Serialize};

use crate::{extractors::Caller, middleware::AppState, response::ApiResponse};

/// Join request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub session_id: String,
    #[serde(default)]
    pub devices: DeviceCapabilities,
}

/// Leave request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub session_id: String,
}

/// Leave response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    /// Whether an open interval was closed.
    pub closed: bool,
}

/// Join the caller into the session's room.
async fn join(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> AppResult<ApiResponse<Admission>> {
    let admission = state
        .admission_service
        .join(&req.session_id, &caller, req.devices)
        .await?;
    Ok(ApiResponse::ok(admission))
}

/// Remove the caller from the room.
async fn leave(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<LeaveRequest>,
) -> AppResult<ApiResponse<LeaveResponse>> {
    let closed = state.admission_service.leave(&req.session_id, &caller).await?;
    Ok(ApiResponse::ok(LeaveResponse { closed }))
}

/// Create the rooms router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/join", post(join))
        .route("/leave", post(leave))
}
