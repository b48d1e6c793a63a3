//! Chat counter and whiteboard endpoints.

use axum::{Json, Router, extract::State, routing::post};
use liveclass_common::AppResult;
use liveclass_core::WhiteboardSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{middleware::AppState, response::ApiResponse};

/// Request naming a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSessionRequest {
    pub session_id: String,
}

/// Save whiteboard request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveWhiteboardRequest {
    pub session_id: String,
    pub snapshot: Value,
}

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Recorded {
    pub recorded: bool,
}

/// Count one chat message.
async fn message(
    State(state): State<AppState>,
    Json(req): Json<ArtifactSessionRequest>,
) -> AppResult<ApiResponse<Recorded>> {
    state.artifact_service.record_message(&req.session_id).await?;
    Ok(ApiResponse::ok(Recorded { recorded: true }))
}

/// Replace the whiteboard snapshot.
async fn save_whiteboard(
    State(state): State<AppState>,
    Json(req): Json<SaveWhiteboardRequest>,
) -> AppResult<ApiResponse<WhiteboardSnapshot>> {
    let saved = state
        .artifact_service
        .save_whiteboard(&req.session_id, req.snapshot)
        .await?;
    Ok(ApiResponse::ok(saved))
}

/// Latest whiteboard snapshot.
async fn show_whiteboard(
    State(state): State<AppState>,
    Json(req): Json<ArtifactSessionRequest>,
) -> AppResult<ApiResponse<WhiteboardSnapshot>> {
    let snapshot = state
        .artifact_service
        .get_whiteboard(&req.session_id)
        .await?;
    Ok(ApiResponse::ok(snapshot))
}

/// Create the artifacts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/message", post(message))
        .route("/whiteboard", post(save_whiteboard))
        .route("/whiteboard/show", post(show_whiteboard))
}
