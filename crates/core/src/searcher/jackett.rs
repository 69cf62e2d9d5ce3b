//! Jackett indexer provider.
//!
//! Each configured Jackett indexer is registered as its own provider so that a
//! slow or broken indexer only drops its own results.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{format_size, ProviderError, ProviderQuery, SearchCategory, SearchProvider, SearchResult};

/// One indexer behind a Jackett server.
pub struct JackettProvider {
    name: String,
    base_url: String,
    api_key: String,
    indexer: String,
    client: Client,
    timeout: Option<Duration>,
}

impl JackettProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        indexer: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            indexer: indexer.into(),
            client,
            timeout,
        })
    }

    /// Build the Jackett API URL for a search.
    fn build_search_url(&self, query: &ProviderQuery) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.indexer),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query.text())
        );

        for cat_id in category_to_jackett_ids(query.category()) {
            url.push_str(&format!("&Category[]={}", cat_id));
        }

        url
    }

    fn to_result(&self, r: JackettResult) -> SearchResult {
        let size_bytes = r.Size.map(|s| s.max(0) as u64);
        let seeders = r.Seeders.unwrap_or(0).max(0);
        SearchResult {
            title: r.Title,
            size: size_bytes.map(format_size).unwrap_or_default(),
            size_bytes,
            seeds: seeders as u32,
            peers: r.Peers.unwrap_or(0).saturating_sub(seeders).max(0) as u32,
            provider: self.name.clone(),
            download_link: r.Link,
            description_page: r.Details,
            swarm_descriptor: r.MagnetUri,
            time: r
                .PublishDate
                .and_then(|d| parse_jackett_date(&d))
                .map(|dt| dt.to_rfc3339()),
        }
    }
}

#[async_trait]
impl SearchProvider for JackettProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<SearchResult>, ProviderError> {
        let url = self.build_search_url(query);
        debug!(provider = %self.name, indexer = %self.indexer, "Searching Jackett");

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

        let jackett_response: JackettResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        debug!(
            provider = %self.name,
            results = jackett_response.Results.len(),
            "Jackett search complete"
        );

        // Jackett returns indexer order; rank by seeders like the public indexes do
        let mut results: Vec<SearchResult> = jackett_response
            .Results
            .into_iter()
            .map(|r| self.to_result(r))
            .collect();
        results.sort_by(|a, b| b.seeds.cmp(&a.seeds));
        results.truncate(query.limit() as usize);
        Ok(results)
    }
}

/// Map our categories to Jackett category IDs.
fn category_to_jackett_ids(cat: SearchCategory) -> Vec<i32> {
    match cat {
        SearchCategory::All => vec![],
        SearchCategory::Movies => vec![2000],
        SearchCategory::Tv => vec![5000],
        SearchCategory::Music => vec![3000],
        SearchCategory::Games => vec![1000],
        SearchCategory::Apps => vec![4000],
        SearchCategory::Books => vec![7000],
        SearchCategory::Anime => vec![5070],
        SearchCategory::Other => vec![8000],
    }
}

/// Parse Jackett's date format.
fn parse_jackett_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    PublishDate: Option<String>,
    Details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn provider() -> JackettProvider {
        JackettProvider::new("1337x", "http://localhost:9117/", "test-key", "1337x", None).unwrap()
    }

    #[test]
    fn test_category_to_jackett_ids() {
        assert_eq!(category_to_jackett_ids(SearchCategory::Music), vec![3000]);
        assert_eq!(category_to_jackett_ids(SearchCategory::Movies), vec![2000]);
        assert_eq!(category_to_jackett_ids(SearchCategory::Tv), vec![5000]);
        assert!(category_to_jackett_ids(SearchCategory::All).is_empty());
    }

    #[test]
    fn test_parse_jackett_date_rfc3339() {
        let date = parse_jackett_date("2024-06-15T10:30:00Z").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 6);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_parse_jackett_date_no_timezone() {
        assert!(parse_jackett_date("2024-06-15T10:30:00").is_some());
        assert!(parse_jackett_date("invalid").is_none());
    }

    #[test]
    fn test_build_search_url() {
        let query = ProviderQuery::new("test query", SearchCategory::All, 10).unwrap();
        let url = provider().build_search_url(&query);
        assert!(url.starts_with("http://localhost:9117/api/v2.0/indexers/1337x/results"));
        assert!(url.contains("apikey=test-key"));
        assert!(url.contains("Query=test%20query"));
        assert!(!url.contains("Category"));
    }

    #[test]
    fn test_build_search_url_with_category() {
        let query = ProviderQuery::new("test", SearchCategory::Tv, 10).unwrap();
        let url = provider().build_search_url(&query);
        assert!(url.contains("Category[]=5000"));
    }

    #[test]
    fn test_to_result_maps_fields() {
        let json = r#"{"Title":"Some.Show.S01E01.1080p","MagnetUri":"magnet:?xt=urn:btih:abc",
            "Link":"http://localhost:9117/dl/1","Size":1073741824,"Seeders":12,"Peers":20,
            "PublishDate":"2024-06-15T10:30:00","Details":"https://1337x.to/torrent/1"}"#;
        let raw: JackettResult = serde_json::from_str(json).unwrap();
        let result = provider().to_result(raw);

        assert_eq!(result.seeds, 12);
        assert_eq!(result.peers, 8);
        assert_eq!(result.size, "1.0 GiB");
        assert_eq!(result.provider, "1337x");
        assert_eq!(result.download_link.as_deref(), Some("http://localhost:9117/dl/1"));
        assert!(result.is_actionable());
    }

    #[test]
    fn test_to_result_without_links_is_not_actionable() {
        let raw: JackettResult =
            serde_json::from_str(r#"{"Title":"No links","Seeders":5}"#).unwrap();
        let result = provider().to_result(raw);
        assert!(!result.is_actionable());
    }
}
