use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use super::{error::panic_response, handlers, middleware::metrics_middleware, playback, search};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness, config and metrics
        .route("/", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Search
        .route("/search", get(search::search))
        .route("/providers", get(search::list_providers))
        // Playback
        .route("/play-torrent", post(playback::play_torrent))
        .route("/sessions", get(playback::list_sessions))
        .route("/sessions/{id}", delete(playback::close_session))
        .with_state(state)
        // innermost first: a panic is rendered before metrics see the response
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
