//! Mock swarm engine for testing.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::swarm::{
    descriptor_key, FileReader, SwarmEngine, SwarmError, SwarmFile, SwarmHandle,
};

/// How a mock swarm answers a metadata request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataBehavior {
    /// Resolve immediately.
    Ready,
    /// Resolve after the given delay.
    Delayed(Duration),
    /// Never resolve (no peers).
    Never,
    /// Fail with a swarm error.
    Fail(String),
    /// Panic while resolving.
    Panic,
}

#[derive(Debug, Clone)]
struct MockSwarm {
    files: Vec<SwarmFile>,
    contents: Vec<Option<Vec<u8>>>,
    metadata: MetadataBehavior,
}

/// Mock implementation of the SwarmEngine trait.
///
/// Provides controllable behavior for testing:
/// - Per-descriptor file lists and file contents
/// - Metadata that resolves late, never, or fails
/// - Join failures
/// - Accounting of open swarm connections
///
/// Unknown descriptors behave like a swarm without peers: metadata never
/// resolves.
///
/// # Example
///
/// ```rust,ignore
/// let engine = MockSwarmEngine::new();
/// engine.add_swarm(&magnet, vec![("movie.mp4".into(), b"...".to_vec())]).await;
/// engine.set_metadata_behavior(&magnet, MetadataBehavior::Never).await;
///
/// // after a request times out
/// assert_eq!(engine.open_connections(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockSwarmEngine {
    swarms: Arc<RwLock<HashMap<String, MockSwarm>>>,
    next_join_error: Arc<RwLock<Option<String>>>,
    open: Arc<AtomicUsize>,
    joins: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl MockSwarmEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a swarm whose files carry real content.
    pub async fn add_swarm(&self, descriptor: &str, files: Vec<(String, Vec<u8>)>) {
        let (files, contents): (Vec<_>, Vec<_>) = files
            .into_iter()
            .map(|(path, content)| (SwarmFile::new(path, content.len() as u64), Some(content)))
            .unzip();
        self.insert(descriptor, files, contents).await;
    }

    /// Register a swarm by file sizes only. Opening its files fails.
    pub async fn add_swarm_files(&self, descriptor: &str, files: Vec<SwarmFile>) {
        let contents = vec![None; files.len()];
        self.insert(descriptor, files, contents).await;
    }

    async fn insert(&self, descriptor: &str, files: Vec<SwarmFile>, contents: Vec<Option<Vec<u8>>>) {
        self.swarms.write().await.insert(
            descriptor_key(descriptor),
            MockSwarm {
                files,
                contents,
                metadata: MetadataBehavior::Ready,
            },
        );
    }

    pub async fn set_metadata_behavior(&self, descriptor: &str, behavior: MetadataBehavior) {
        if let Some(swarm) = self.swarms.write().await.get_mut(&descriptor_key(descriptor)) {
            swarm.metadata = behavior;
        }
    }

    /// Make the next join fail.
    pub async fn fail_next_join(&self, message: &str) {
        *self.next_join_error.write().await = Some(message.to_string());
    }

    /// Joined swarms not shut down yet.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn join_count(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwarmEngine for MockSwarmEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn join(
        &self,
        _session_id: Uuid,
        descriptor: &str,
    ) -> Result<Arc<dyn SwarmHandle>, SwarmError> {
        if let Some(message) = self.next_join_error.write().await.take() {
            return Err(SwarmError::Join(message));
        }

        let swarm = self
            .swarms
            .read()
            .await
            .get(&descriptor_key(descriptor))
            .cloned()
            .unwrap_or(MockSwarm {
                files: Vec::new(),
                contents: Vec::new(),
                metadata: MetadataBehavior::Never,
            });

        self.joins.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(MockSwarmHandle {
            swarm,
            closed: AtomicBool::new(false),
            open: self.open.clone(),
            shutdowns: self.shutdowns.clone(),
        }))
    }
}

struct MockSwarmHandle {
    swarm: MockSwarm,
    closed: AtomicBool,
    open: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl SwarmHandle for MockSwarmHandle {
    async fn metadata(&self) -> Result<Vec<SwarmFile>, SwarmError> {
        match &self.swarm.metadata {
            MetadataBehavior::Ready => {}
            MetadataBehavior::Delayed(delay) => tokio::time::sleep(*delay).await,
            MetadataBehavior::Never => std::future::pending::<()>().await,
            MetadataBehavior::Fail(message) => return Err(SwarmError::Metadata(message.clone())),
            MetadataBehavior::Panic => panic!("mock swarm metadata panic"),
        }
        Ok(self.swarm.files.clone())
    }

    async fn open_file(&self, index: usize) -> Result<FileReader, SwarmError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SwarmError::Engine("swarm is shut down".to_string()));
        }
        match self.swarm.contents.get(index) {
            Some(Some(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(None) => Err(SwarmError::Engine(format!("no content for file {}", index))),
            None => Err(SwarmError::FileNotFound(index)),
        }
    }

    async fn shutdown(&self) -> Result<(), SwarmError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.open.fetch_sub(1, Ordering::SeqCst);
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_join_and_shutdown_accounting() {
        let engine = MockSwarmEngine::new();
        let magnet = fixtures::magnet("abc");
        engine
            .add_swarm(&magnet, vec![("movie.mp4".to_string(), b"hello".to_vec())])
            .await;

        let handle = engine.join(Uuid::new_v4(), &magnet).await.unwrap();
        assert_eq!(engine.open_connections(), 1);

        let files = handle.metadata().await.unwrap();
        assert_eq!(files, vec![SwarmFile::new("movie.mp4", 5)]);

        let mut reader = handle.open_file(0).await.unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).await.unwrap();
        assert_eq!(buf, "hello");

        handle.shutdown().await.unwrap();
        handle.shutdown().await.unwrap();
        assert_eq!(engine.open_connections(), 0);
        assert_eq!(engine.shutdown_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_descriptor_never_resolves() {
        let engine = MockSwarmEngine::new();
        let handle = engine
            .join(Uuid::new_v4(), &fixtures::magnet("ffff"))
            .await
            .unwrap();
        let result = tokio::time::timeout(Duration::from_secs(60), handle.metadata()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fail_next_join() {
        let engine = MockSwarmEngine::new();
        engine.fail_next_join("offline").await;
        assert!(engine.join(Uuid::new_v4(), "magnet:?xt=urn:btih:1").await.is_err());
        assert!(engine.join(Uuid::new_v4(), "magnet:?xt=urn:btih:1").await.is_ok());
        assert_eq!(engine.join_count(), 1);
    }
}
