use std::sync::Arc;

use swarmstream_core::{Config, PlaybackManager, SanitizedConfig, SearchAggregator};

/// Shared application state
pub struct AppState {
    config: Config,
    aggregator: SearchAggregator,
    playback: Arc<PlaybackManager>,
}

impl AppState {
    pub fn new(config: Config, aggregator: SearchAggregator, playback: Arc<PlaybackManager>) -> Self {
        Self {
            config,
            aggregator,
            playback,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn aggregator(&self) -> &SearchAggregator {
        &self.aggregator
    }

    /// The playback manager. Cloned into spawned request tasks.
    pub fn playback(&self) -> &Arc<PlaybackManager> {
        &self.playback
    }
}
