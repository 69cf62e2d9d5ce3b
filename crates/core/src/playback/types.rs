//! Types for playback sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::swarm::SwarmError;

/// Lifecycle state of a swarm session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Joining,
    MetadataReady,
    Streaming,
    Failed,
    TimedOut,
    Closed,
}

/// Returned to the caller of a successful playback request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStarted {
    pub session_id: Uuid,
    pub stream_url: String,
    pub file_name: String,
    /// True when an already streaming session for the same torrent was returned.
    pub reused: bool,
}

/// Read-only view of a registered session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub descriptor: String,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Errors from a playback request. Each one is fatal to that request only.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Magnet URI is required")]
    MissingDescriptor,

    #[error("Failed to join swarm: {0}")]
    SwarmJoin(#[from] SwarmError),

    #[error("Timed out waiting for torrent metadata")]
    MetadataTimeout,

    #[error("No playable file found in torrent")]
    NoPlayableFile,

    #[error("Failed to bind stream endpoint: {0}")]
    EndpointBind(String),

    #[error("A session for this torrent is already being opened")]
    SessionInProgress,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PlaybackError::MissingDescriptor)
    }

    /// Stable error kind reported to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            PlaybackError::MissingDescriptor => "validation_error",
            PlaybackError::SwarmJoin(_) => "swarm_join_error",
            PlaybackError::MetadataTimeout => "metadata_timeout",
            PlaybackError::NoPlayableFile => "no_playable_file",
            PlaybackError::EndpointBind(_) => "endpoint_bind_error",
            PlaybackError::SessionInProgress => "session_in_progress",
            PlaybackError::SessionNotFound(_) => "session_not_found",
            PlaybackError::Internal(_) => "internal_error",
        }
    }

    /// Label used for the playback request counter.
    pub(crate) fn metric_label(&self) -> &'static str {
        match self {
            PlaybackError::MissingDescriptor | PlaybackError::SessionInProgress => "rejected",
            PlaybackError::MetadataTimeout => "timed_out",
            _ => "failed",
        }
    }
}
