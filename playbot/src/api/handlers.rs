//! HTTP request handlers
//!
//! Thin wrappers over [`CommandService`](crate::commands::CommandService):
//! extract, call, and map [`Error`] onto a status code.

use super::server::AppContext;
use crate::error::Error;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use playbot_common::SessionId;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    status: String,
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    reference: String,
    #[serde(default = "default_requester")]
    requester: String,
}

fn default_requester() -> String {
    "api".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    name: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyExists(_) => StatusCode::CONFLICT,
        Error::Resolution(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::SessionClosed(_) => StatusCode::GONE,
        Error::Storage(_)
        | Error::Transport(_)
        | Error::Config(_)
        | Error::Io(_)
        | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            error: err.to_string(),
        }),
    )
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "playbot".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// POST /api/v1/sessions/:id/join
pub async fn join(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::commands::SessionSummary> {
    ctx.commands
        .join(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/sessions/:id/leave
pub async fn leave(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::commands::SessionSummary> {
    ctx.commands
        .leave(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/v1/sessions/:id
pub async fn session_status(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::playback::SessionStatus> {
    ctx.commands
        .status(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/sessions/:id/queue
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<crate::commands::EnqueueOutcome>), ApiError> {
    ctx.commands
        .enqueue(SessionId(id), &req.reference, &req.requester)
        .await
        .map(|outcome| (StatusCode::CREATED, Json(outcome)))
        .map_err(error_response)
}

/// GET /api/v1/sessions/:id/queue
pub async fn list_queue(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::playback::SessionStatus> {
    ctx.commands
        .list_queue(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /api/v1/sessions/:id/queue/:index
pub async fn remove_from_queue(
    State(ctx): State<AppContext>,
    Path((id, index)): Path<(u64, usize)>,
) -> ApiResult<crate::commands::RemovedTrack> {
    ctx.commands
        .remove_from_queue(SessionId(id), index)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/sessions/:id/skip
pub async fn skip(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::commands::SkipOutcome> {
    ctx.commands
        .skip(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/sessions/:id/clear
pub async fn clear(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::commands::ClearOutcome> {
    ctx.commands
        .clear(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/sessions/:id/shuffle
pub async fn shuffle(
    State(ctx): State<AppContext>,
    Path(id): Path<u64>,
) -> ApiResult<crate::playback::SessionStatus> {
    ctx.commands
        .shuffle(SessionId(id))
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/sessions/:id/playlist/:name
pub async fn enqueue_playlist(
    State(ctx): State<AppContext>,
    Path((id, name)): Path<(u64, String)>,
) -> ApiResult<crate::commands::AddedCount> {
    ctx.commands
        .enqueue_playlist(SessionId(id), &name)
        .await
        .map(Json)
        .map_err(error_response)
}

// ============================================================================
// Playlist Endpoints
// ============================================================================

/// GET /api/v1/playlists
pub async fn list_playlists(
    State(ctx): State<AppContext>,
) -> Json<crate::commands::PlaylistListing> {
    Json(ctx.commands.list_playlists().await)
}

/// POST /api/v1/playlists
pub async fn create_playlist(
    State(ctx): State<AppContext>,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<crate::commands::PlaylistDetail>), ApiError> {
    ctx.commands
        .create_playlist(&req.name)
        .await
        .map(|detail| (StatusCode::CREATED, Json(detail)))
        .map_err(error_response)
}

/// GET /api/v1/playlists/:name
pub async fn show_playlist(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> ApiResult<crate::commands::PlaylistDetail> {
    ctx.commands
        .show_playlist(&name)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /api/v1/playlists/:name
pub async fn delete_playlist(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> ApiResult<StatusResponse> {
    ctx.commands
        .delete_playlist(&name)
        .await
        .map(|()| ok())
        .map_err(error_response)
}

/// DELETE /api/v1/playlists/:name/tracks/:index
pub async fn remove_from_playlist(
    State(ctx): State<AppContext>,
    Path((name, index)): Path<(String, usize)>,
) -> ApiResult<crate::commands::RemovedTrack> {
    ctx.commands
        .remove_from_playlist(&name, index)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/playlists/:name/from-session/:id
pub async fn add_queue_to_playlist(
    State(ctx): State<AppContext>,
    Path((name, id)): Path<(String, u64)>,
) -> ApiResult<crate::commands::AddedCount> {
    ctx.commands
        .add_queue_to_playlist(SessionId(id), &name)
        .await
        .map(Json)
        .map_err(error_response)
}
