//! Orchestrates swarm sessions from playback request to stream URL.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::selection::{FileSelector, VideoFirst};
use super::session::{EndpointBinding, SwarmSession};
use super::types::{PlaybackError, PlaybackStarted, SessionState, SessionSummary};
use crate::config::PlaybackConfig;
use crate::metrics::{ACTIVE_SESSIONS, METADATA_WAIT_DURATION, PLAYBACK_REQUESTS};
use crate::swarm::{descriptor_key, SwarmEngine};

/// Owns every streaming session.
///
/// Only sessions that reached `Streaming` are registered. A request that
/// fails at any step closes its session before the error is returned.
pub struct PlaybackManager {
    engine: Arc<dyn SwarmEngine>,
    selector: Arc<dyn FileSelector>,
    metadata_timeout: Duration,
    binding: EndpointBinding,
    sessions: RwLock<HashMap<Uuid, SwarmSession>>,
    /// Descriptor keys of requests still being opened.
    pending: Mutex<HashSet<String>>,
}

impl PlaybackManager {
    pub fn new(engine: Arc<dyn SwarmEngine>, config: &PlaybackConfig) -> Self {
        Self::with_selector(engine, Arc::new(VideoFirst), config)
    }

    pub fn with_selector(
        engine: Arc<dyn SwarmEngine>,
        selector: Arc<dyn FileSelector>,
        config: &PlaybackConfig,
    ) -> Self {
        Self {
            engine,
            selector,
            metadata_timeout: Duration::from_secs(config.metadata_timeout_secs),
            binding: EndpointBinding {
                addr: SocketAddr::new(config.stream_bind_host, config.stream_port),
                public_host: config.public_host(),
            },
            sessions: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn metadata_timeout(&self) -> Duration {
        self.metadata_timeout
    }

    /// Turn a swarm descriptor into a stream URL.
    ///
    /// Joins the swarm, waits for metadata until the deadline, selects the
    /// file and binds its endpoint. A descriptor that is already streaming
    /// returns the existing session; one still being opened is rejected.
    pub async fn request_playback(
        &self,
        descriptor: &str,
    ) -> Result<PlaybackStarted, PlaybackError> {
        let result = self.request_playback_inner(descriptor).await;
        let label = match &result {
            Ok(started) if started.reused => "reused",
            Ok(_) => "started",
            Err(e) => e.metric_label(),
        };
        PLAYBACK_REQUESTS.with_label_values(&[label]).inc();
        result
    }

    async fn request_playback_inner(
        &self,
        descriptor: &str,
    ) -> Result<PlaybackStarted, PlaybackError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(PlaybackError::MissingDescriptor);
        }
        let key = descriptor_key(descriptor);

        let _pending = PendingGuard::acquire(&self.pending, &key)?;

        // Sessions are registered before their pending entry is released, so
        // this check cannot miss one that finished concurrently.
        if let Some(existing) = self.find_streaming(&key).await {
            info!(session_id = %existing.session_id, "Reusing streaming session");
            return Ok(existing);
        }

        let deadline = Instant::now() + self.metadata_timeout;
        let mut slot: Option<SwarmSession> = None;

        let outcome = AssertUnwindSafe(self.establish(&mut slot, descriptor, deadline))
            .catch_unwind()
            .await;

        let outcome = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Playback request panicked");
                Err(PlaybackError::Internal(message))
            }
        };

        match outcome {
            Ok(started) => {
                let Some(session) = slot else {
                    return Err(PlaybackError::Internal("session missing".to_string()));
                };
                self.sessions.write().await.insert(session.id(), session);
                ACTIVE_SESSIONS.inc();
                info!(session_id = %started.session_id, url = %started.stream_url, "Playback started");
                Ok(started)
            }
            Err(e) => {
                if let Some(mut session) = slot {
                    session.close().await;
                }
                warn!(error = %e, kind = e.kind(), "Playback request failed");
                Err(e)
            }
        }
    }

    /// Steps 2-6. The session is placed in `slot` as soon as it exists so the
    /// caller can tear it down on every exit path, including a panic.
    async fn establish(
        &self,
        slot: &mut Option<SwarmSession>,
        descriptor: &str,
        deadline: Instant,
    ) -> Result<PlaybackStarted, PlaybackError> {
        let session = tokio::time::timeout_at(
            deadline,
            SwarmSession::open(self.engine.as_ref(), descriptor),
        )
        .await
        .map_err(|_| PlaybackError::MetadataTimeout)??;
        let session = slot.insert(session);

        let wait_started = Instant::now();
        let wait = session.wait_for_metadata(deadline).await.map(|_| ());
        METADATA_WAIT_DURATION.observe(wait_started.elapsed().as_secs_f64());
        wait?;

        let file_name = session.select_file(self.selector.as_ref())?.name.clone();
        let stream_url = session
            .open_stream_endpoint(&self.binding)
            .await?
            .stream_url
            .clone();

        Ok(PlaybackStarted {
            session_id: session.id(),
            stream_url,
            file_name,
            reused: false,
        })
    }

    async fn find_streaming(&self, key: &str) -> Option<PlaybackStarted> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.state() == SessionState::Streaming)
            .find(|s| descriptor_key(s.descriptor()) == key)
            .and_then(|s| {
                Some(PlaybackStarted {
                    session_id: s.id(),
                    stream_url: s.endpoint()?.stream_url.clone(),
                    file_name: s.selected_file()?.name.clone(),
                    reused: true,
                })
            })
    }

    /// Close and forget one session.
    pub async fn close_session(&self, id: Uuid) -> Result<(), PlaybackError> {
        let session = self.sessions.write().await.remove(&id);
        match session {
            Some(mut session) => {
                session.close().await;
                ACTIVE_SESSIONS.dec();
                Ok(())
            }
            None => Err(PlaybackError::SessionNotFound(id)),
        }
    }

    /// Summaries of registered sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| s.summary())
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session. Called on process shutdown.
    pub async fn shutdown(&self) {
        let drained: Vec<SwarmSession> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, s)| s)
            .collect();

        if drained.is_empty() {
            return;
        }
        info!(sessions = drained.len(), "Closing playback sessions");

        let closes = drained.into_iter().map(|mut s| async move {
            s.close().await;
            ACTIVE_SESSIONS.dec();
        });
        futures::future::join_all(closes).await;
    }
}

/// Marks a descriptor as being opened until dropped.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> PendingGuard<'a> {
    fn acquire(pending: &'a Mutex<HashSet<String>>, key: &str) -> Result<Self, PlaybackError> {
        let mut set = pending
            .lock()
            .map_err(|_| PlaybackError::Internal("pending set poisoned".to_string()))?;
        if !set.insert(key.to_string()) {
            return Err(PlaybackError::SessionInProgress);
        }
        Ok(Self {
            pending,
            key: key.to_string(),
        })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.pending.lock() {
            set.remove(&self.key);
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MetadataBehavior, MockSwarmEngine};
    use std::net::{IpAddr, Ipv4Addr};

    const HASH: &str = "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c";

    fn config() -> PlaybackConfig {
        PlaybackConfig {
            stream_bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..Default::default()
        }
    }

    async fn manager_with(files: Vec<(&str, &[u8])>) -> (Arc<MockSwarmEngine>, PlaybackManager) {
        let engine = Arc::new(MockSwarmEngine::new());
        engine
            .add_swarm(
                &fixtures::magnet(HASH),
                files
                    .into_iter()
                    .map(|(n, c)| (n.to_string(), c.to_vec()))
                    .collect(),
            )
            .await;
        let manager = PlaybackManager::new(engine.clone(), &config());
        (engine, manager)
    }

    #[tokio::test]
    async fn test_empty_descriptor_rejected_without_join() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"x")]).await;
        let err = manager.request_playback("   ").await.unwrap_err();
        assert!(matches!(err, PlaybackError::MissingDescriptor));
        assert_eq!(engine.join_count(), 0);
    }

    #[tokio::test]
    async fn test_request_playback_returns_stream_url() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"movie bytes")]).await;

        let started = manager
            .request_playback(&fixtures::magnet(HASH))
            .await
            .unwrap();
        assert!(started.stream_url.starts_with("http://127.0.0.1:"));
        assert!(started.stream_url.ends_with("/movie.mp4"));
        assert_eq!(started.file_name, "movie.mp4");
        assert!(!started.reused);
        assert_eq!(engine.join_count(), 1);
        assert_eq!(manager.session_count().await, 1);

        manager.shutdown().await;
        assert_eq!(engine.open_connections(), 0);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_request_reuses_streaming_session() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"movie bytes")]).await;
        let magnet = fixtures::magnet(HASH);

        let first = manager.request_playback(&magnet).await.unwrap();
        let second = manager
            .request_playback(&format!("{}&tr=udp%3A%2F%2Fother", magnet))
            .await
            .unwrap();

        assert!(second.reused);
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.stream_url, first.stream_url);
        assert_eq!(engine.join_count(), 1);
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_while_opening_is_rejected() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"movie bytes")]).await;
        let magnet = fixtures::magnet(HASH);
        engine
            .set_metadata_behavior(&magnet, MetadataBehavior::Delayed(Duration::from_secs(5)))
            .await;

        let (first, second) = tokio::join!(manager.request_playback(&magnet), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            manager.request_playback(&magnet).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(PlaybackError::SessionInProgress)));
        assert_eq!(engine.join_count(), 1);
        manager.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_closes_session() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"x")]).await;
        let magnet = fixtures::magnet(HASH);
        engine
            .set_metadata_behavior(&magnet, MetadataBehavior::Never)
            .await;

        let started = Instant::now();
        let err = manager.request_playback(&magnet).await.unwrap_err();

        assert!(matches!(err, PlaybackError::MetadataTimeout));
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(31));
        assert_eq!(engine.open_connections(), 0);
        assert_eq!(manager.session_count().await, 0);

        // the descriptor is free again
        engine
            .set_metadata_behavior(&magnet, MetadataBehavior::Ready)
            .await;
        assert!(manager.request_playback(&magnet).await.is_ok());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_playable_file_closes_session() {
        let (engine, manager) = manager_with(vec![]).await;
        let err = manager
            .request_playback(&fixtures::magnet(HASH))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::NoPlayableFile));
        assert_eq!(engine.open_connections(), 0);
        assert_eq!(engine.shutdown_count(), 1);
    }

    #[tokio::test]
    async fn test_join_failure_is_reported() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"x")]).await;
        engine.fail_next_join("engine offline").await;

        let err = manager
            .request_playback(&fixtures::magnet(HASH))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "swarm_join_error");
        assert_eq!(engine.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_panic_is_isolated_and_session_closed() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"x")]).await;
        let magnet = fixtures::magnet(HASH);
        engine
            .set_metadata_behavior(&magnet, MetadataBehavior::Panic)
            .await;

        let err = manager.request_playback(&magnet).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Internal(_)));
        assert_eq!(engine.open_connections(), 0);
        assert_eq!(engine.shutdown_count(), 1);
    }

    #[tokio::test]
    async fn test_close_session() {
        let (engine, manager) = manager_with(vec![("movie.mp4", b"x")]).await;
        let started = manager
            .request_playback(&fixtures::magnet(HASH))
            .await
            .unwrap();

        let listed = manager.list_sessions().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, started.session_id);
        assert_eq!(listed[0].state, SessionState::Streaming);

        manager.close_session(started.session_id).await.unwrap();
        assert_eq!(engine.open_connections(), 0);
        assert!(matches!(
            manager.close_session(started.session_id).await,
            Err(PlaybackError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_get_distinct_ports() {
        let engine = Arc::new(MockSwarmEngine::new());
        let a = fixtures::magnet("1111111111111111111111111111111111111111");
        let b = fixtures::magnet("2222222222222222222222222222222222222222");
        engine
            .add_swarm(&a, vec![("a.mp4".to_string(), b"a".to_vec())])
            .await;
        engine
            .add_swarm(&b, vec![("b.mkv".to_string(), b"b".to_vec())])
            .await;
        let manager = PlaybackManager::new(engine.clone(), &config());

        let (first, second) = tokio::join!(manager.request_playback(&a), manager.request_playback(&b));
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first.stream_url, second.stream_url);
        assert_eq!(manager.session_count().await, 2);

        manager.shutdown().await;
        assert_eq!(engine.open_connections(), 0);
    }
}
