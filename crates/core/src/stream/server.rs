//! Per-session HTTP server exposing the selected file.

use std::borrow::Cow;
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::range::{content_type_for_path, parse_range_header, RangeError};
use crate::swarm::{SwarmFile, SwarmHandle};

/// How long in-flight responses get to finish on close.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Where a session's stream can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEndpoint {
    pub session_id: Uuid,
    pub bound_port: u16,
    pub stream_url: String,
}

/// The file a stream endpoint serves.
#[derive(Clone)]
pub struct StreamSource {
    pub handle: Arc<dyn SwarmHandle>,
    pub file_index: usize,
    pub file: SwarmFile,
}

/// A running stream endpoint. Dropping it without [`close`](Self::close)
/// leaves the server task running until its shutdown sender is dropped.
pub struct StreamEndpointServer {
    endpoint: StreamEndpoint,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StreamEndpointServer {
    /// Bind `addr` (port 0 picks a free port) and start serving `source`.
    pub async fn bind(
        session_id: Uuid,
        source: StreamSource,
        addr: SocketAddr,
        public_host: &str,
    ) -> Result<Self, StreamError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StreamError::Bind { addr, source })?;
        let bound_port = listener
            .local_addr()
            .map_err(|source| StreamError::Bind { addr, source })?
            .port();

        let stream_url = format!(
            "http://{}:{}/{}",
            url_host(public_host),
            bound_port,
            encode_path(&source.file.relative_path)
        );

        let router = Router::new()
            .route("/{*path}", get(serve_file))
            .with_state(Arc::new(source));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!(session_id = %session_id, error = %e, "Stream endpoint stopped with error");
            }
        });

        info!(session_id = %session_id, port = bound_port, url = %stream_url, "Stream endpoint listening");

        Ok(Self {
            endpoint: StreamEndpoint {
                session_id,
                bound_port,
                stream_url,
            },
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// Stop accepting connections and release the port. Idempotent.
    pub async fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                debug!(session_id = %self.endpoint.session_id, "Aborting stream endpoint after grace period");
                task.abort();
            }
        }
    }
}

/// IPv6 literals need brackets inside a URL authority.
fn url_host(host: &str) -> Cow<'_, str> {
    match host.parse::<Ipv6Addr>() {
        Ok(ip) => Cow::Owned(format!("[{}]", ip)),
        Err(_) => Cow::Borrowed(host),
    }
}

fn encode_path(relative_path: &str) -> String {
    relative_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn serve_file(
    State(source): State<Arc<StreamSource>>,
    Path(path): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if path != source.file.relative_path {
        return StatusCode::NOT_FOUND.into_response();
    }

    let size = source.file.size_bytes;
    let content_type = content_type_for_path(&source.file.relative_path);

    let range = match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(value) => match parse_range_header(value, size) {
            Ok(r) => Some(r),
            Err(RangeError::Unsatisfiable(_)) => {
                return (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(header::CONTENT_RANGE, format!("bytes */{}", size))],
                )
                    .into_response();
            }
            // Malformed ranges are ignored and the whole file is served
            Err(RangeError::Malformed(reason)) => {
                debug!(reason = %reason, "Ignoring range header");
                None
            }
        },
        None => None,
    };

    let (status, start, length) = match range {
        Some(r) => (StatusCode::PARTIAL_CONTENT, r.start, r.len()),
        None => (StatusCode::OK, 0, size),
    };

    let mut response_headers = vec![
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
        (header::ACCEPT_RANGES, "bytes".to_string()),
    ];
    if let Some(r) = range {
        response_headers.push((header::CONTENT_RANGE, r.content_range(size)));
    }

    let mut response_header_map = HeaderMap::new();
    for (name, value) in response_headers {
        match value.parse() {
            Ok(v) => {
                response_header_map.insert(name, v);
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    if method == Method::HEAD {
        return (status, response_header_map).into_response();
    }

    let mut reader = match source.handle.open_file(source.file_index).await {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Failed to open swarm file");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    if start > 0 {
        if let Err(e) = reader.seek(std::io::SeekFrom::Start(start)).await {
            warn!(error = %e, "Seek failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    }

    let stream = ReaderStream::new(reader.take(length));
    (status, response_header_map, Body::from_stream(stream)).into_response()
}
