//! Playback API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use swarmstream_core::{PlaybackError, SessionSummary};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    #[serde(default)]
    pub magnet_uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub success: bool,
    pub message: String,
    pub stream_url: String,
    pub session_id: Uuid,
    pub file_name: String,
    pub reused: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub success: bool,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// POST /play-torrent
///
/// Joins the swarm and answers with the stream URL of the selected file.
/// The request runs in its own task: a client that disconnects early does
/// not cancel it halfway, and the session is either registered or fully
/// torn down.
pub async fn play_torrent(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<PlayResponse>, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "Unreadable play-torrent body");
            PlayRequest::default()
        }
    };
    let descriptor = request.magnet_uri.unwrap_or_default();
    if descriptor.trim().is_empty() {
        return Err(PlaybackError::MissingDescriptor.into());
    }

    let playback = Arc::clone(state.playback());
    let task = tokio::spawn(async move { playback.request_playback(&descriptor).await });

    let started = match task.await {
        Ok(result) => result?,
        Err(e) => {
            error!(error = %e, "Playback task failed");
            return Err(ApiError::internal("Playback request failed unexpectedly"));
        }
    };

    info!(
        session_id = %started.session_id,
        file = %started.file_name,
        reused = started.reused,
        "Stream ready"
    );

    Ok(Json(PlayResponse {
        success: true,
        message: format!("Streaming {}", started.file_name),
        stream_url: started.stream_url,
        session_id: started.session_id,
        file_name: started.file_name,
        reused: started.reused,
    }))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        success: true,
        sessions: state.playback().list_sessions().await,
    })
}

/// DELETE /sessions/{id}
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::validation(format!("Invalid session id: {}", id)))?;

    state.playback().close_session(id).await?;
    info!(session_id = %id, "Session closed via API");

    Ok(Json(MessageResponse {
        success: true,
        message: format!("Session {} closed", id),
    }))
}
