//! Torrent search across independent providers.
//!
//! This module provides a `SearchProvider` trait for torrent indexes
//! (apibay, torrents-csv, Jackett indexers) and a `SearchAggregator` that
//! fans a query out to all of them under a per-provider deadline.

mod aggregator;
mod apibay;
mod jackett;
mod torrents_csv;
mod types;

use std::sync::Arc;
use std::time::Duration;

pub use aggregator::SearchAggregator;
pub use apibay::ApibayProvider;
pub use jackett::JackettProvider;
pub use torrents_csv::TorrentsCsvProvider;
pub use types::*;

use crate::config::{ProviderConfig, ProviderKind, SearchConfig};

/// Create every enabled provider, in configuration order.
pub fn build_providers(
    config: &SearchConfig,
) -> Result<Vec<Arc<dyn SearchProvider>>, ProviderError> {
    config
        .providers
        .iter()
        .filter(|p| p.enabled)
        .map(build_provider)
        .collect()
}

fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn SearchProvider>, ProviderError> {
    let timeout = config.timeout_secs.map(|s| Duration::from_secs(s as u64));
    let provider: Arc<dyn SearchProvider> = match config.kind {
        ProviderKind::Apibay => Arc::new(ApibayProvider::new(
            config.name.clone(),
            config.url.clone(),
            timeout,
        )?),
        ProviderKind::TorrentsCsv => Arc::new(TorrentsCsvProvider::new(
            config.name.clone(),
            config.url.clone(),
            timeout,
        )?),
        ProviderKind::Jackett => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::Internal(format!("provider {}: missing api_key", config.name))
            })?;
            let indexer = config.indexer.clone().ok_or_else(|| {
                ProviderError::Internal(format!("provider {}: missing indexer", config.name))
            })?;
            Arc::new(JackettProvider::new(
                config.name.clone(),
                config.url.clone(),
                api_key,
                indexer,
                timeout,
            )?)
        }
    };
    Ok(provider)
}

/// Build the aggregator straight from configuration.
pub fn build_aggregator(config: &SearchConfig) -> Result<SearchAggregator, ProviderError> {
    let providers = build_providers(config)?;
    Ok(SearchAggregator::new(
        providers,
        Duration::from_secs(config.timeout_secs as u64),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_providers_skips_disabled() {
        let config: SearchConfig = toml::from_str(
            r#"
[[providers]]
name = "tpb"
kind = "apibay"
url = "https://apibay.org"

[[providers]]
name = "csv"
kind = "torrents_csv"
url = "https://torrents-csv.com"
enabled = false

[[providers]]
name = "1337x"
kind = "jackett"
url = "http://localhost:9117"
api_key = "key"
indexer = "1337x"
timeout_secs = 9
"#,
        )
        .unwrap();

        let providers = build_providers(&config).unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["tpb", "1337x"]);
        assert_eq!(providers[1].timeout(), Some(Duration::from_secs(9)));
        assert_eq!(providers[0].timeout(), None);
    }

    #[test]
    fn test_build_provider_jackett_without_key_fails() {
        let config = ProviderConfig {
            name: "jackett".to_string(),
            kind: ProviderKind::Jackett,
            enabled: true,
            url: "http://localhost:9117".to_string(),
            api_key: None,
            indexer: Some("1337x".to_string()),
            timeout_secs: None,
        };
        assert!(build_provider(&config).is_err());
    }
}
