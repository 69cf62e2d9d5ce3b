//! The Pirate Bay JSON API (`q.php`) provider.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    format_size, magnet_uri, ProviderError, ProviderQuery, SearchCategory, SearchProvider,
    SearchResult,
};

/// Trackers appended to generated magnets so peers can be found without DHT.
const PUBLIC_TRACKERS: &[&str] = &[
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://open.stealth.si:80/announce",
    "udp://tracker.torrent.eu.org:451/announce",
    "udp://exodus.desync.com:6969/announce",
];

/// Info hash apibay uses for its "No results returned" placeholder row.
const EMPTY_HASH: &str = "0000000000000000000000000000000000000000";

const DESCRIPTION_BASE: &str = "https://thepiratebay.org/description.php?id=";

/// Search provider backed by an apibay-compatible endpoint.
pub struct ApibayProvider {
    name: String,
    base_url: String,
    client: Client,
    timeout: Option<Duration>,
}

impl ApibayProvider {
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
            "{}/q.php?q={}&cat={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query.text()),
            category_code(query.category())
        )
    }

    fn to_result(&self, row: ApibayRow) -> Option<SearchResult> {
        if row.info_hash == EMPTY_HASH || row.id == "0" {
            return None;
        }
        let size_bytes = row.size.parse::<u64>().ok();
        let seeders = row.seeders.parse::<u32>().unwrap_or(0);
        let leechers = row.leechers.parse::<u32>().unwrap_or(0);
        let time = row
            .added
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339());

        Some(SearchResult {
            size: size_bytes.map(format_size).unwrap_or_else(|| row.size.clone()),
            size_bytes,
            seeds: seeders,
            peers: leechers,
            provider: self.name.clone(),
            download_link: None,
            description_page: Some(format!("{}{}", DESCRIPTION_BASE, row.id)),
            swarm_descriptor: Some(magnet_uri(&row.info_hash, &row.name, PUBLIC_TRACKERS)),
            time,
            title: row.name,
        })
    }
}

#[async_trait]
impl SearchProvider for ApibayProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<SearchResult>, ProviderError> {
        let url = self.build_search_url(query);
        debug!(provider = %self.name, "Searching apibay");

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

        let rows: Vec<ApibayRow> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| self.to_result(row))
            .take(query.limit() as usize)
            .collect())
    }
}

/// Map our categories to apibay category codes (0 = all).
fn category_code(category: SearchCategory) -> u32 {
    match category {
        SearchCategory::All => 0,
        SearchCategory::Movies => 201,
        SearchCategory::Tv => 205,
        SearchCategory::Music => 101,
        SearchCategory::Games => 400,
        SearchCategory::Apps => 300,
        SearchCategory::Books => 601,
        SearchCategory::Anime => 200,
        SearchCategory::Other => 600,
    }
}

// apibay returns every field as a string
#[derive(Debug, Deserialize)]
struct ApibayRow {
    id: String,
    name: String,
    info_hash: String,
    #[serde(default)]
    leechers: String,
    #[serde(default)]
    seeders: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    added: String,
}
