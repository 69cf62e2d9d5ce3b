//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock search providers and a mock swarm engine injected, so the whole
//! HTTP surface can be exercised without network access.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use swarmstream_core::{
    testing::{MockProvider, MockSwarmEngine},
    Config, PlaybackConfig, PlaybackManager, ProviderConfig, ProviderKind, SearchAggregator,
    SearchConfig, SearchProvider, ServerConfig,
};

/// Re-export fixtures for test convenience
pub use swarmstream_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Two search providers, `tpb` then `csv` in registration order
/// - The swarm engine (MockSwarmEngine)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_play() {
///     let fixture = TestFixture::new().await;
///     fixture.engine.add_swarm(&magnet, vec![("movie.mp4".into(), b"..".to_vec())]).await;
///
///     let response = fixture.post("/play-torrent", json!({ "magnetUri": magnet })).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// First registered provider
    pub tpb: Arc<MockProvider>,
    /// Second registered provider
    pub csv: Arc<MockProvider>,
    /// Mock swarm engine - configure files and metadata behavior
    pub engine: Arc<MockSwarmEngine>,
    /// Playback manager behind the router
    pub playback: Arc<PlaybackManager>,
    /// Download folder (unused by the mock engine, kept for config realism)
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub provider_timeout: Duration,
    pub metadata_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(5),
            metadata_timeout_secs: 30,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let tpb = Arc::new(MockProvider::new("tpb"));
        let csv = Arc::new(MockProvider::new("csv"));
        let engine = Arc::new(MockSwarmEngine::new());

        let config = Config {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 3000, // Not used for in-process testing
            },
            search: SearchConfig {
                timeout_secs: test_config.provider_timeout.as_secs() as u32,
                default_limit: 10,
                max_limit: 100,
                providers: vec![
                    provider_config("tpb", ProviderKind::Apibay, "https://apibay.org"),
                    provider_config("csv", ProviderKind::TorrentsCsv, "https://torrents-csv.com"),
                ],
            },
            playback: PlaybackConfig {
                metadata_timeout_secs: test_config.metadata_timeout_secs,
                download_path: temp_dir.path().to_path_buf(),
                enable_dht: false,
                stream_bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                ..Default::default()
            },
        };

        let providers: Vec<Arc<dyn SearchProvider>> = vec![
            Arc::clone(&tpb) as Arc<dyn SearchProvider>,
            Arc::clone(&csv) as Arc<dyn SearchProvider>,
        ];
        let aggregator = SearchAggregator::new(providers, test_config.provider_timeout);
        let playback = Arc::new(PlaybackManager::new(engine.clone(), &config.playback));

        let state = Arc::new(swarmstream_server::state::AppState::new(
            config,
            aggregator,
            Arc::clone(&playback),
        ));
        let router = swarmstream_server::api::create_router(state);

        Self {
            router,
            tpb,
            csv,
            engine,
            playback,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        TestResponse {
            status,
            body: parse_body(&bytes),
        }
    }

    /// GET returning the raw body text (for non-JSON endpoints).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let (status, bytes) = self.send(request).await;

        TestResponse {
            status,
            body: parse_body(&bytes),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}

fn provider_config(name: &str, kind: ProviderKind, url: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        kind,
        enabled: true,
        url: url.to_string(),
        api_key: None,
        indexer: None,
        timeout_secs: None,
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
