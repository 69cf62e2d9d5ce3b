//! librqbit embedded swarm engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use librqbit::{
    AddTorrent, AddTorrentOptions, AddTorrentResponse, ManagedTorrent, Session, SessionOptions,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{FileReader, SwarmEngine, SwarmError, SwarmFile, SwarmHandle};
use crate::config::PlaybackConfig;

/// Swarm engine backed by one process-wide librqbit session.
pub struct LibrqbitEngine {
    session: Arc<Session>,
    download_path: PathBuf,
}

impl LibrqbitEngine {
    /// Create the librqbit session from playback configuration.
    pub async fn new(config: &PlaybackConfig) -> Result<Self, SwarmError> {
        let download_path = config.download_path.clone();

        if !download_path.exists() {
            std::fs::create_dir_all(&download_path).map_err(|e| {
                SwarmError::Engine(format!("Failed to create download directory: {}", e))
            })?;
        }

        let mut opts = SessionOptions::default();

        if !config.enable_dht {
            opts.disable_dht = true;
        }

        // Range, not RangeInclusive
        if let Some(port) = config.listen_port {
            opts.listen_port_range = Some(port..(port + 1));
        }

        // Sessions never outlive the process
        opts.persistence = None;

        info!(
            download_path = %download_path.display(),
            dht_enabled = !opts.disable_dht,
            "Initializing librqbit session"
        );

        let session = Session::new_with_opts(download_path.clone(), opts)
            .await
            .map_err(|e| {
                SwarmError::Engine(format!("Failed to initialize librqbit session: {}", e))
            })?;

        if let Some(port) = session.tcp_listen_port() {
            info!(port = port, "librqbit listening on TCP port");
        }

        Ok(Self {
            session,
            download_path,
        })
    }
}

#[async_trait]
impl SwarmEngine for LibrqbitEngine {
    fn name(&self) -> &str {
        "librqbit"
    }

    async fn join(
        &self,
        session_id: Uuid,
        descriptor: &str,
    ) -> Result<Arc<dyn SwarmHandle>, SwarmError> {
        let descriptor = descriptor.trim();
        if !descriptor.starts_with("magnet:") {
            return Err(SwarmError::InvalidDescriptor(
                "expected a magnet URI".to_string(),
            ));
        }

        let folder = self.download_path.join(session_id.to_string());
        tokio::fs::create_dir_all(&folder).await.map_err(|e| {
            SwarmError::Join(format!("Failed to create session folder: {}", e))
        })?;

        debug!(session_id = %session_id, folder = %folder.display(), "Joining swarm");

        Ok(Arc::new(LibrqbitHandle {
            session: self.session.clone(),
            descriptor: descriptor.to_string(),
            folder,
            torrent: RwLock::new(None),
        }))
    }
}

fn format_hash(hash: &librqbit_core::Id20) -> String {
    hash.as_string()
}

/// A torrent added to the shared librqbit session.
struct LibrqbitHandle {
    session: Arc<Session>,
    descriptor: String,
    folder: PathBuf,
    torrent: RwLock<Option<Arc<ManagedTorrent>>>,
}

impl LibrqbitHandle {
    fn list_files(torrent: &ManagedTorrent) -> Result<Vec<SwarmFile>, SwarmError> {
        torrent
            .with_metadata(|meta| {
                meta.file_infos
                    .iter()
                    .map(|fi| SwarmFile::new(path_to_slash(&fi.relative_filename), fi.len))
                    .collect::<Vec<_>>()
            })
            .map_err(|e| SwarmError::Metadata(e.to_string()))
    }

    async fn current(&self) -> Result<Arc<ManagedTorrent>, SwarmError> {
        self.torrent
            .read()
            .await
            .clone()
            .ok_or(SwarmError::MetadataPending)
    }
}

#[async_trait]
impl SwarmHandle for LibrqbitHandle {
    async fn metadata(&self) -> Result<Vec<SwarmFile>, SwarmError> {
        if let Some(torrent) = self.torrent.read().await.clone() {
            return Self::list_files(&torrent);
        }

        let opts = AddTorrentOptions {
            output_folder: Some(self.folder.to_string_lossy().into_owned()),
            overwrite: true,
            ..Default::default()
        };

        // For magnets librqbit resolves metadata from peers before returning
        let response = self
            .session
            .add_torrent(AddTorrent::from_url(&self.descriptor), Some(opts))
            .await
            .map_err(|e| SwarmError::Join(format!("Failed to add torrent: {}", e)))?;

        let torrent = match response {
            AddTorrentResponse::Added(_, handle) => handle,
            // Owned by another session; removing it on our shutdown would cut that stream
            AddTorrentResponse::AlreadyManaged(_, handle) => {
                warn!(info_hash = %format_hash(&handle.info_hash()), "Torrent already managed");
                return Err(SwarmError::Join(
                    "torrent is already open in another session".to_string(),
                ));
            }
            AddTorrentResponse::ListOnly(_) => {
                return Err(SwarmError::Engine(
                    "Torrent was added in list-only mode".to_string(),
                ))
            }
        };

        // Record ownership first so shutdown deletes it even if listing fails
        *self.torrent.write().await = Some(torrent.clone());

        let files = Self::list_files(&torrent)?;
        debug!(
            info_hash = %format_hash(&torrent.info_hash()),
            files = files.len(),
            "Swarm metadata resolved"
        );
        Ok(files)
    }

    async fn open_file(&self, index: usize) -> Result<FileReader, SwarmError> {
        let torrent = self.current().await?;
        let stream = torrent.clone().stream(index).map_err(|e| {
            if index >= Self::list_files(&torrent).map(|f| f.len()).unwrap_or(0) {
                SwarmError::FileNotFound(index)
            } else {
                SwarmError::Engine(format!("Failed to open stream: {}", e))
            }
        })?;
        Ok(Box::new(stream))
    }

    async fn shutdown(&self) -> Result<(), SwarmError> {
        if let Some(torrent) = self.torrent.write().await.take() {
            let id = torrent.id();
            self.session
                .delete(id.into(), true)
                .await
                .map_err(|e| SwarmError::Engine(format!("Failed to remove torrent: {}", e)))?;
            debug!(info_hash = %format_hash(&torrent.info_hash()), "Torrent removed");
        }

        match tokio::fs::remove_dir_all(&self.folder).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SwarmError::Io(e)),
        }
    }
}

fn path_to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_to_slash() {
        let path = PathBuf::from("Season 1").join("episode 01.mkv");
        assert_eq!(path_to_slash(&path), "Season 1/episode 01.mkv");
    }

    #[tokio::test]
    async fn test_join_rejects_non_magnet() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlaybackConfig {
            download_path: dir.path().to_path_buf(),
            enable_dht: false,
            ..Default::default()
        };
        let engine = LibrqbitEngine::new(&config).await.unwrap();

        let err = engine
            .join(Uuid::new_v4(), "http://example.org/file.torrent")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SwarmError::InvalidDescriptor(_)));
    }

    #[tokio::test]
    async fn test_shutdown_before_metadata_removes_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlaybackConfig {
            download_path: dir.path().to_path_buf(),
            enable_dht: false,
            ..Default::default()
        };
        let engine = LibrqbitEngine::new(&config).await.unwrap();
        let session_id = Uuid::new_v4();

        let handle = engine
            .join(
                session_id,
                "magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c",
            )
            .await
            .unwrap();
        assert!(dir.path().join(session_id.to_string()).exists());

        handle.shutdown().await.unwrap();
        assert!(!dir.path().join(session_id.to_string()).exists());
        assert!(matches!(
            handle.open_file(0).await.err().unwrap(),
            SwarmError::MetadataPending
        ));
    }

    #[tokio::test]
    async fn test_failed_add_leaves_session_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlaybackConfig {
            download_path: dir.path().to_path_buf(),
            enable_dht: false,
            ..Default::default()
        };
        let engine = LibrqbitEngine::new(&config).await.unwrap();
        let session_id = Uuid::new_v4();

        let handle = engine
            .join(session_id, "magnet:?xt=urn:btih:not-a-hash")
            .await
            .unwrap();

        assert!(matches!(
            handle.metadata().await.err().unwrap(),
            SwarmError::Join(_)
        ));
        assert_eq!(engine.session.with_torrents(|torrents| torrents.count()), 0);

        handle.shutdown().await.unwrap();
        assert!(!dir.path().join(session_id.to_string()).exists());
    }
}
