//! Types for the torrent search system.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable parameters for one search call.
///
/// Built through [`ProviderQuery::new`], which rejects empty text and a zero
/// limit, so every provider sees a usable query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderQuery {
    text: String,
    category: SearchCategory,
    limit: u32,
}

impl ProviderQuery {
    pub fn new(
        text: impl Into<String>,
        category: SearchCategory,
        limit: u32,
    ) -> Result<Self, SearchError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if limit == 0 {
            return Err(SearchError::InvalidLimit);
        }
        Ok(Self {
            text,
            category,
            limit,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn category(&self) -> SearchCategory {
        self.category
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// Content category for filtering search results.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SearchCategory {
    #[default]
    All,
    Movies,
    #[serde(rename = "TV")]
    Tv,
    Music,
    Games,
    Apps,
    Books,
    Anime,
    Other,
}

impl SearchCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::All => "All",
            SearchCategory::Movies => "Movies",
            SearchCategory::Tv => "TV",
            SearchCategory::Music => "Music",
            SearchCategory::Games => "Games",
            SearchCategory::Apps => "Apps",
            SearchCategory::Books => "Books",
            SearchCategory::Anime => "Anime",
            SearchCategory::Other => "Other",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchCategory {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(SearchCategory::All),
            "movies" | "movie" => Ok(SearchCategory::Movies),
            "tv" => Ok(SearchCategory::Tv),
            "music" => Ok(SearchCategory::Music),
            "games" => Ok(SearchCategory::Games),
            "apps" | "applications" => Ok(SearchCategory::Apps),
            "books" => Ok(SearchCategory::Books),
            "anime" => Ok(SearchCategory::Anime),
            "other" => Ok(SearchCategory::Other),
            _ => Err(SearchError::UnknownCategory(s.to_string())),
        }
    }
}

/// A single search hit as reported by one provider.
///
/// Field names on the wire follow what the player front-end reads
/// (`size`, `seeds`, `peers`, `link`, `desc`, `magnet`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    /// Human readable size (e.g. "1.4 GiB").
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub seeds: u32,
    pub peers: u32,
    pub provider: String,
    /// Direct .torrent download link.
    #[serde(rename = "link", default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    /// Description page on the index.
    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub description_page: Option<String>,
    /// Magnet URI.
    #[serde(rename = "magnet", default, skip_serializing_if = "Option::is_none")]
    pub swarm_descriptor: Option<String>,
    /// Upload time as reported by the index (RFC 3339 when parseable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl SearchResult {
    /// A result can be acted on when it carries a magnet or a .torrent link.
    pub fn is_actionable(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.swarm_descriptor) || present(&self.download_link)
    }
}

/// Outcome of one provider within an aggregated search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    Ok,
    Unavailable,
    TimedOut,
}

/// Providers-status side channel entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub state: ProviderState,
    pub result_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Merged results plus per-provider status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub providers: Vec<ProviderStatus>,
    pub duration_ms: u64,
}

impl SearchOutcome {
    pub fn unavailable_providers(&self) -> impl Iterator<Item = &ProviderStatus> {
        self.providers.iter().filter(|p| p.state != ProviderState::Ok)
    }
}

/// Errors raised by a single provider. Never escape the aggregator.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::ApiError(e.to_string())
        }
    }
}

/// Errors surfaced by the aggregator to its caller.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query parameter \"q\" is required")]
    EmptyQuery,

    #[error("Limit must be a positive integer")]
    InvalidLimit,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("No search providers are enabled")]
    NoProviders,

    #[error("All providers failed: {}", summarize(.0))]
    AllProvidersFailed(Vec<ProviderStatus>),
}

impl SearchError {
    /// Validation errors are the caller's fault; the rest are aggregation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SearchError::EmptyQuery | SearchError::InvalidLimit | SearchError::UnknownCategory(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        if self.is_validation() {
            "validation_error"
        } else {
            "aggregation_error"
        }
    }
}

fn summarize(statuses: &[ProviderStatus]) -> String {
    statuses
        .iter()
        .map(|s| match &s.error {
            Some(e) => format!("{} ({})", s.name, e),
            None => s.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trait for torrent index backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name, reported on every result and in provider status.
    fn name(&self) -> &str;

    /// Per-provider deadline override. `None` uses the aggregator default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Query the index. Results come back in the provider's own ranking.
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<SearchResult>, ProviderError>;
}

/// Render a byte count with binary units, e.g. `1.4 GiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Build a magnet URI from an info hash and display name.
pub fn magnet_uri(info_hash: &str, name: &str, trackers: &[&str]) -> String {
    let mut uri = format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        info_hash.to_lowercase(),
        urlencoding::encode(name)
    );
    for tracker in trackers {
        uri.push_str("&tr=");
        uri.push_str(&urlencoding::encode(tracker));
    }
    uri
}
