use super::state::AppState;
use crate::error::SessionError;
use crate::session::{Asset, SessionSummary};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Instructions for the interviewer
    pub prompt: String,

    /// Asset manifest produced by ingestion; must not be empty
    pub assets: Vec<Asset>,

    /// Optional knowledge-base snapshot
    pub knowledge_base: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub connect_url: String,
    pub relay_url: String,
    pub asset_manifest: Vec<Asset>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndSessionRequest {
    pub summary: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub status: String,
    pub summary: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct OpenConnectionResponse {
    pub session_id: String,
    pub connection_id: String,
    pub relay_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SessionError::SessionEnded(_) => StatusCode::CONFLICT,
            SessionError::ChannelClosed => StatusCode::GONE,
            SessionError::Pipeline(_) => StatusCode::BAD_GATEWAY,
            SessionError::Io(_) | SessionError::Serialization(_) => {
                error!("Storage failure: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, SessionError>;

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Json<CreateSessionResponse>> {
    let session = state
        .service
        .create_session(req.session_id, &req.prompt, req.assets, req.knowledge_base)
        .await?;

    Ok(Json(CreateSessionResponse {
        connect_url: format!("/api/connections/{}", session.session_id),
        relay_url: format!("/ws/{}", session.session_id),
        session_id: session.session_id,
        asset_manifest: session.assets,
    }))
}

/// GET /api/sessions?active_only=true
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<Vec<SessionSummary>>> {
    Ok(Json(state.service.list_sessions(query.active_only).await?))
}

/// GET /api/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    let session = state.service.get_session(&session_id).await?;
    Ok(Json(session.listing()))
}

/// POST /api/sessions/:session_id/end
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Option<Json<EndSessionRequest>>,
) -> ApiResult<Json<EndSessionResponse>> {
    let summary = body.and_then(|Json(req)| req.summary);
    info!("Ending session {}", session_id);

    let session = state.service.end_session(&session_id, summary).await?;
    Ok(Json(EndSessionResponse {
        status: "ended".to_string(),
        summary: session.summary,
    }))
}

/// GET /api/sessions/:session_id/artifacts/json
pub async fn get_summary_artifact(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let session = state.service.get_session(&session_id).await?;
    Ok(Json(session.summary_artifact()))
}

/// GET /api/sessions/:session_id/artifacts/transcript
pub async fn get_transcript_json(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let session = state.service.get_session(&session_id).await?;
    Ok(Json(session.transcript_json()))
}

/// GET /api/sessions/:session_id/artifacts/transcript.txt
pub async fn get_transcript_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<String> {
    let session = state.service.get_session(&session_id).await?;
    Ok(session.transcript_text())
}

/// POST /api/connections/:session_id
pub async fn open_connection(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<OpenConnectionResponse>> {
    let opened = state.service.open_connection(&session_id).await?;
    Ok(Json(OpenConnectionResponse {
        connection_id: opened.connection.id().to_string(),
        relay_url: format!("/ws/{}", session_id),
        session_id,
    }))
}

/// DELETE /api/connections/:session_id
pub async fn close_connection(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.close_connection(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/connections/:session_id/status
pub async fn connection_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    Json(state.service.connection_status(&session_id).await)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
