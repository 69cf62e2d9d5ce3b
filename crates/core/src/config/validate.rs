use std::collections::HashSet;

use super::{types::Config, ConfigError, ProviderKind};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Search deadline and limits are usable
/// - At least one provider is enabled, names are unique
/// - Jackett providers carry an api key and indexer
/// - Playback metadata deadline is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let search = &config.search;
    if search.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "search.timeout_secs cannot be 0".to_string(),
        ));
    }
    if search.default_limit == 0 || search.default_limit > search.max_limit {
        return Err(ConfigError::ValidationError(format!(
            "search.default_limit must be between 1 and search.max_limit ({})",
            search.max_limit
        )));
    }

    let mut names = HashSet::new();
    for provider in &search.providers {
        if provider.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "search.providers[].name cannot be empty".to_string(),
            ));
        }
        if !names.insert(provider.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate provider name: {}",
                provider.name
            )));
        }
        if !provider.url.starts_with("http://") && !provider.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "provider {}: url must start with http:// or https://",
                provider.name
            )));
        }
        if provider.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "provider {}: timeout_secs cannot be 0",
                provider.name
            )));
        }
        if provider.kind == ProviderKind::Jackett {
            let has_key = provider.api_key.as_deref().is_some_and(|k| !k.is_empty());
            let has_indexer = provider.indexer.as_deref().is_some_and(|i| !i.is_empty());
            if !has_key || !has_indexer {
                return Err(ConfigError::ValidationError(format!(
                    "provider {}: jackett providers need api_key and indexer",
                    provider.name
                )));
            }
        }
    }

    if !search.providers.iter().any(|p| p.enabled) {
        return Err(ConfigError::ValidationError(
            "at least one search provider must be enabled".to_string(),
        ));
    }

    if config.playback.metadata_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "playback.metadata_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
