//! Session endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use liveclass_common::AppResult;
use liveclass_core::{AttendanceReport, CreateSessionInput, Occupancy, UpdateSessionInput};
use liveclass_db::entities::{live_session, live_session::SessionStatus};
use serde::{Deserialize, Serialize};

use crate::{extractors::Caller, middleware::AppState, response::ApiResponse};

/// Session-level rollups.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadataResponse {
    pub total_participants: i64,
    pub peak_concurrent_users: i64,
    pub average_attendance_ms: Option<i64>,
    pub attended_count: Option<i64>,
    pub total_messages: i64,
    pub polls_created: i64,
}

/// Session response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub room_id: String,
    pub organizer_id: String,
    pub course_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: SessionStatus,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub max_participants: i32,
    pub camera_required: bool,
    pub microphone_required: bool,
    pub allow_late_join: bool,
    pub attendance_threshold_percent: i32,
    pub metadata: SessionMetadataResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<live_session::Model> for SessionResponse {
    fn from(s: live_session::Model) -> Self {
        Self {
            id: s.id,
            room_id: s.room_id,
            organizer_id: s.organizer_id,
            course_id: s.course_id,
            title: s.title,
            description: s.description,
            status: s.status,
            scheduled_start: s.scheduled_start.with_timezone(&Utc),
            scheduled_end: s.scheduled_end.with_timezone(&Utc),
            actual_start: s.actual_start.map(|t| t.with_timezone(&Utc)),
            actual_end: s.actual_end.map(|t| t.with_timezone(&Utc)),
            max_participants: s.max_participants,
            camera_required: s.camera_required,
            microphone_required: s.microphone_required,
            allow_late_join: s.allow_late_join,
            attendance_threshold_percent: s.attendance_threshold_percent,
            metadata: SessionMetadataResponse {
                total_participants: s.total_participants,
                peak_concurrent_users: s.peak_concurrent_users,
                average_attendance_ms: s.average_attendance_ms,
                attended_count: s.attended_count,
                total_messages: s.total_messages,
                polls_created: s.polls_created,
            },
            created_at: s.created_at.with_timezone(&Utc),
            updated_at: s.updated_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Request naming a single session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdRequest {
    pub session_id: String,
}

/// Update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub session_id: String,
    #[serde(flatten)]
    pub patch: UpdateSessionInput,
}

/// List request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsRequest {
    /// Defaults to the caller.
    pub organizer_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Schedule a session owned by the caller.
async fn create(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<CreateSessionInput>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.session_service.create(&caller, req).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Get a session.
async fn show(
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.session_service.get(&req.session_id).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Patch a session.
async fn update(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<UpdateSessionRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state
        .session_service
        .update(&caller, &req.session_id, req.patch)
        .await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Go live.
async fn start(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.session_service.start(&caller, &req.session_id).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Complete the session and compute attendance.
async fn end(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.session_service.end(&caller, &req.session_id).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Cancel the session.
async fn cancel(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<SessionResponse>> {
    let session = state.session_service.cancel(&caller, &req.session_id).await?;
    Ok(ApiResponse::ok(session.into()))
}

/// Attendance report of a completed session.
async fn attendance(
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<AttendanceReport>> {
    let report = state
        .attendance_service
        .get_attendance(&req.session_id)
        .await?;
    Ok(ApiResponse::ok(report))
}

/// Current room occupancy.
async fn occupancy(
    State(state): State<AppState>,
    Json(req): Json<SessionIdRequest>,
) -> AppResult<ApiResponse<Occupancy>> {
    let occupancy = state
        .admission_service
        .get_occupancy(&req.session_id)
        .await?;
    Ok(ApiResponse::ok(occupancy))
}

/// Sessions of an organizer.
async fn list(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(req): Json<ListSessionsRequest>,
) -> AppResult<ApiResponse<Vec<SessionResponse>>> {
    let organizer_id = req.organizer_id.unwrap_or(caller);
    let sessions = state
        .session_service
        .list_by_organizer(&organizer_id, req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(
        sessions.into_iter().map(SessionResponse::from).collect(),
    ))
}

/// Create the sessions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/update", post(update))
        .route("/start", post(start))
        .route("/end", post(end))
        .route("/cancel", post(cancel))
        .route("/attendance", post(attendance))
        .route("/occupancy", post(occupancy))
        .route("/list", post(list))
}
