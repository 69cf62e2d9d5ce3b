//! torrents-csv.com search service provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{format_size, magnet_uri, ProviderError, ProviderQuery, SearchProvider, SearchResult};

/// Search provider for the torrents-csv service.
///
/// The index has no categories, so the query category is ignored.
pub struct TorrentsCsvProvider {
    name: String,
    base_url: String,
    client: Client,
    timeout: Option<Duration>,
}

impl TorrentsCsvProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("swarmstream/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            client,
            timeout,
        })
    }

    fn build_search_url(&self, query: &ProviderQuery) -> String {
        format!(
            "{}/service/search?q={}&size={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query.text()),
            query.limit()
        )
    }

    fn to_result(&self, row: CsvTorrent) -> SearchResult {
        SearchResult {
            size: format_size(row.size_bytes),
            size_bytes: Some(row.size_bytes),
            seeds: row.seeders.max(0) as u32,
            peers: row.leechers.max(0) as u32,
            provider: self.name.clone(),
            download_link: None,
            description_page: None,
            swarm_descriptor: Some(magnet_uri(&row.infohash, &row.name, &[])),
            time: DateTime::from_timestamp(row.created_unix, 0).map(|dt| dt.to_rfc3339()),
            title: row.name,
        }
    }
}

#[async_trait]
impl SearchProvider for TorrentsCsvProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<SearchResult>, ProviderError> {
        let url = self.build_search_url(query);
        debug!(provider = %self.name, "Searching torrents-csv");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let page: CsvResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(page
            .torrents
            .into_iter()
            .take(query.limit() as usize)
            .map(|row| self.to_result(row))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CsvResponse {
    #[serde(default)]
    torrents: Vec<CsvTorrent>,
}

#[derive(Debug, Deserialize)]
struct CsvTorrent {
    infohash: String,
    name: String,
    #[serde(default)]
    size_bytes: u64,
    #[serde(default)]
    created_unix: i64,
    #[serde(default)]
    seeders: i64,
    #[serde(default)]
    leechers: i64,
}
