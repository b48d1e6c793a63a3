//! Poll endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use liveclass_common::{AppError, AppResult};
use liveclass_core::{CreatePollInput, PollResults};
use liveclass_db::entities::{poll_response, session_poll};
use serde::{Deserialize, Serialize};

use crate::{extractors::Caller, middleware::AppState, response::ApiResponse};

/// Poll response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub session_id: String,
    pub position: i32,
    pub question: String,
    pub options: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<session_poll::Model> for PollResponse {
    type Error = AppError;

    fn try_from(p: session_poll::Model) -> Result<Self, Self::Error> {
        let options: Vec<String> = serde_json::from_value(p.options)
            .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;
        Ok(Self {
            id: p.id,
            session_id: p.session_id,
            position: p.position,
            question: p.question,
            options,
            is_active: p.is_active,
            created_at: p.created_at.with_timezone(&Utc),
            closed_at: p.closed_at.map(|t| t.with_timezone(&Utc)),
        })
    }
}

/// A participant's recorded answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub poll_id: String,
    pub participant_id: String,
    pub option_index: i32,
    pub responded_at: DateTime<Utc>,
}

impl From<poll_response::Model> for AnswerResponse {
    fn from(r: poll_response::Model) -> Self {
        Self {
            poll_id: r.poll_id,
            participant_id: r.participant_id,
            option_index: r.option_index,
            responded_at: r.responded_at.with_timezone(&Utc),
        }
    }
}

/// Create poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub session_id: String,
    #[serde(flatten)]
    pub poll: CreatePollInput,
}

/// Respond request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub session_id: String,
    pub poll_id: String,
    pub option_index: i32,
}

/// Close poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePollRequest {
    pub session_id: String,
    pub poll_id: String,
}

/// Results request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultsRequest {
    pub poll_id: String,
}

/// List polls request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPollsRequest {
    pub session_id: String,
}

/// Launch a poll. Any active poll in the session is closed first.
async fn create(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .artifact_service
        .create_poll(&caller, &req.session_id, req.poll)
        .await?;
    Ok(ApiResponse::ok(poll.try_into()?))
}

/// Answer a poll as the caller.
async fn respond(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<RespondRequest>,
) -> AppResult<ApiResponse<AnswerResponse>> {
    let answer = state
        .artifact_service
        .respond(&req.session_id, &req.poll_id, &caller, req.option_index)
        .await?;
    Ok(ApiResponse::ok(answer.into()))
}

/// Stop accepting answers.
async fn close(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<ClosePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .artifact_service
        .close_poll(&caller, &req.session_id, &req.poll_id)
        .await?;
    Ok(ApiResponse::ok(poll.try_into()?))
}

/// Current tally.
async fn results(
    State(state): State<AppState>,
    Json(req): Json<PollResultsRequest>,
) -> AppResult<ApiResponse<PollResults>> {
    let results = state.artifact_service.results(&req.poll_id).await?;
    Ok(ApiResponse::ok(results))
}

/// Polls of a session in creation order.
async fn list(
    State(state): State<AppState>,
    Json(req): Json<ListPollsRequest>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state.artifact_service.list_polls(&req.session_id).await?;
    let polls = polls
        .into_iter()
        .map(PollResponse::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ApiResponse::ok(polls))
}

/// Create the polls router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/respond", post(respond))
        .route("/close", post(close))
        .route("/results", post(results))
        .route("/list", post(list))
}
