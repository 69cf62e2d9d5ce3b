//! Types for the swarm engine abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek};
use uuid::Uuid;

/// One file inside a swarm, as listed by its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmFile {
    pub name: String,
    pub size_bytes: u64,
    /// Path inside the torrent, `/`-separated.
    pub relative_path: String,
}

impl SwarmFile {
    /// Build a file entry from a `/`-separated relative path.
    pub fn new(relative_path: impl Into<String>, size_bytes: u64) -> Self {
        let relative_path = relative_path.into();
        let name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&relative_path)
            .to_string();
        Self {
            name,
            size_bytes,
            relative_path,
        }
    }
}

/// Errors from the swarm engine.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Invalid swarm descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Failed to join swarm: {0}")]
    Join(String),

    #[error("Metadata resolution failed: {0}")]
    Metadata(String),

    #[error("Metadata is not available yet")]
    MetadataPending,

    #[error("File index {0} is not part of the swarm")]
    FileNotFound(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(String),
}

/// Readable, seekable view over one file of a swarm.
pub trait FileRead: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> FileRead for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

pub type FileReader = Box<dyn FileRead>;

/// Entry point to the peer-to-peer network.
#[async_trait]
pub trait SwarmEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Start joining the swarm for `descriptor` on behalf of `session_id`.
    ///
    /// Peer discovery starts here; nothing is known about the files until
    /// [`SwarmHandle::metadata`] resolves.
    async fn join(
        &self,
        session_id: Uuid,
        descriptor: &str,
    ) -> Result<Arc<dyn SwarmHandle>, SwarmError>;
}

/// One joined swarm.
#[async_trait]
pub trait SwarmHandle: Send + Sync {
    /// Resolve the file list. Dropping the future stops discovery.
    async fn metadata(&self) -> Result<Vec<SwarmFile>, SwarmError>;

    /// Open a reader over file `index`. Reads wait for the pieces they need.
    async fn open_file(&self, index: usize) -> Result<FileReader, SwarmError>;

    /// Disconnect from peers and drop downloaded pieces.
    async fn shutdown(&self) -> Result<(), SwarmError>;
}

/// Key used to detect duplicate requests for the same swarm.
///
/// For magnets this is the lowercase `btih` info hash, so the same torrent
/// with different trackers or display names maps to the same key.
pub fn descriptor_key(descriptor: &str) -> String {
    let trimmed = descriptor.trim();
    trimmed
        .split(['?', '&'])
        .find_map(|part| {
            let (key, value) = part.split_once('=')?;
            if !key.eq_ignore_ascii_case("xt") {
                return None;
            }
            let lower = value.to_ascii_lowercase();
            lower.strip_prefix("urn:btih:").map(str::to_string)
        })
        .unwrap_or_else(|| trimmed.to_string())
}
