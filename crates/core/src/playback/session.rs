//! One peer-to-peer download driven towards a stream endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::selection::FileSelector;
use super::types::{PlaybackError, SessionState, SessionSummary};
use crate::stream::{StreamEndpoint, StreamEndpointServer, StreamSource};
use crate::swarm::{SwarmEngine, SwarmFile, SwarmHandle};

/// Where a session's stream endpoint binds and how its URL is written.
#[derive(Debug, Clone)]
pub struct EndpointBinding {
    pub addr: SocketAddr,
    pub public_host: String,
}

/// A swarm session.
///
/// State moves `Joining -> MetadataReady -> Streaming`, or ends in `Failed`
/// or `TimedOut`. Every state ends in `Closed` after [`close`](Self::close),
/// which releases the swarm and the endpoint.
pub struct SwarmSession {
    id: Uuid,
    descriptor: String,
    state: SessionState,
    files: Vec<SwarmFile>,
    selected_file: Option<usize>,
    created_at: DateTime<Utc>,
    handle: Option<Arc<dyn SwarmHandle>>,
    endpoint: Option<StreamEndpointServer>,
}

impl SwarmSession {
    /// Join the swarm for `descriptor`.
    pub async fn open(engine: &dyn SwarmEngine, descriptor: &str) -> Result<Self, PlaybackError> {
        let id = Uuid::new_v4();
        let handle = engine.join(id, descriptor).await?;
        info!(session_id = %id, engine = engine.name(), "Swarm session opened");

        Ok(Self {
            id,
            descriptor: descriptor.to_string(),
            state: SessionState::Joining,
            files: Vec::new(),
            selected_file: None,
            created_at: Utc::now(),
            handle: Some(handle),
            endpoint: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected_file(&self) -> Option<&SwarmFile> {
        self.selected_file.and_then(|idx| self.files.get(idx))
    }

    pub fn endpoint(&self) -> Option<&StreamEndpoint> {
        self.endpoint.as_ref().map(|e| e.endpoint())
    }

    /// Wait for the file list until `deadline`.
    ///
    /// The metadata future is dropped when the deadline passes, which stops
    /// discovery. The session is left `TimedOut`; the caller closes it.
    pub async fn wait_for_metadata(
        &mut self,
        deadline: Instant,
    ) -> Result<&[SwarmFile], PlaybackError> {
        self.expect_state(SessionState::Joining)?;
        let handle = self.handle()?;

        match tokio::time::timeout_at(deadline, handle.metadata()).await {
            Ok(Ok(files)) => {
                debug!(session_id = %self.id, files = files.len(), "Metadata ready");
                self.files = files;
                self.state = SessionState::MetadataReady;
                Ok(&self.files)
            }
            Ok(Err(e)) => {
                warn!(session_id = %self.id, error = %e, "Swarm failed before metadata");
                self.state = SessionState::Failed;
                Err(PlaybackError::SwarmJoin(e))
            }
            Err(_) => {
                warn!(session_id = %self.id, "Metadata deadline elapsed");
                self.state = SessionState::TimedOut;
                Err(PlaybackError::MetadataTimeout)
            }
        }
    }

    /// Run file selection over the resolved file list.
    pub fn select_file(&mut self, selector: &dyn FileSelector) -> Result<&SwarmFile, PlaybackError> {
        self.expect_state(SessionState::MetadataReady)?;

        match selector.select(&self.files) {
            Some(idx) if idx < self.files.len() => {
                self.selected_file = Some(idx);
                debug!(session_id = %self.id, file = %self.files[idx].relative_path, "File selected");
                Ok(&self.files[idx])
            }
            _ => {
                self.state = SessionState::Failed;
                Err(PlaybackError::NoPlayableFile)
            }
        }
    }

    /// Bind the stream endpoint for the selected file.
    pub async fn open_stream_endpoint(
        &mut self,
        binding: &EndpointBinding,
    ) -> Result<&StreamEndpoint, PlaybackError> {
        self.expect_state(SessionState::MetadataReady)?;
        let handle = self.handle()?;
        let file_index = self
            .selected_file
            .ok_or_else(|| PlaybackError::Internal("no file selected".to_string()))?;

        let source = StreamSource {
            handle,
            file_index,
            file: self.files[file_index].clone(),
        };

        match StreamEndpointServer::bind(self.id, source, binding.addr, &binding.public_host).await
        {
            Ok(server) => {
                self.state = SessionState::Streaming;
                Ok(self.endpoint.insert(server).endpoint())
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Stream endpoint bind failed");
                self.state = SessionState::Failed;
                Err(PlaybackError::EndpointBind(e.to_string()))
            }
        }
    }

    /// Release the endpoint and the swarm. Closing twice is a no-op.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(mut endpoint) = self.endpoint.take() {
            endpoint.close().await;
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.shutdown().await {
                warn!(session_id = %self.id, error = %e, "Swarm teardown failed");
            }
        }

        info!(session_id = %self.id, from = ?self.state, "Swarm session closed");
        self.state = SessionState::Closed;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            descriptor: self.descriptor.clone(),
            state: self.state,
            file_name: self.selected_file().map(|f| f.name.clone()),
            stream_url: self.endpoint().map(|e| e.stream_url.clone()),
            created_at: self.created_at,
        }
    }

    fn handle(&self) -> Result<Arc<dyn SwarmHandle>, PlaybackError> {
        self.handle
            .clone()
            .ok_or_else(|| PlaybackError::Internal("swarm handle released".to_string()))
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), PlaybackError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PlaybackError::Internal(format!(
                "session {} is {:?}, expected {:?}",
                self.id, self.state, expected
            )))
        }
    }
}
