//! Search API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use swarmstream_core::{ProviderQuery, ProviderStatus, SearchCategory, SearchError, SearchResult};
use tracing::info;

use super::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Query string of `GET /search`. Kept as raw strings so bad values become
/// validation errors in our own envelope.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub result_count: usize,
    pub data: Vec<SearchResult>,
    pub providers: Vec<ProviderStatus>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub success: bool,
    pub providers: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /search?q=&category=&limit=
///
/// Fan the query out to every enabled provider and merge what answers in time.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limits = &state.config().search;
    let query = build_query(&params, limits.default_limit, limits.max_limit)?;

    info!(
        query = %query.text(),
        category = %query.category(),
        limit = query.limit(),
        "Search request"
    );

    let outcome = state.aggregator().search(&query).await?;

    Ok(Json(SearchResponse {
        success: true,
        query: query.text().to_string(),
        result_count: outcome.results.len(),
        data: outcome.results,
        providers: outcome.providers,
        duration_ms: outcome.duration_ms,
    }))
}

/// GET /providers
///
/// Names of the enabled providers.
pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        success: true,
        providers: state.aggregator().provider_names(),
    })
}

fn build_query(
    params: &SearchParams,
    default_limit: u32,
    max_limit: u32,
) -> Result<ProviderQuery, SearchError> {
    let text = params.q.as_deref().unwrap_or_default();

    let category = match params.category.as_deref() {
        Some(raw) => raw.parse::<SearchCategory>()?,
        None => SearchCategory::All,
    };

    let limit = match params.limit.as_deref().map(str::trim) {
        None | Some("") => default_limit,
        Some(raw) => raw.parse::<u32>().map_err(|_| SearchError::InvalidLimit)?,
    };

    ProviderQuery::new(text, category, limit.min(max_limit))
}
