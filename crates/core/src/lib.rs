pub mod config;
pub mod metrics;
pub mod playback;
pub mod searcher;
pub mod stream;
pub mod swarm;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, PlaybackConfig,
    ProviderConfig, ProviderKind, SanitizedConfig, SearchConfig, ServerConfig,
};
pub use playback::{
    PlaybackError, PlaybackManager, PlaybackStarted, SessionState, SessionSummary, SwarmSession,
};
pub use searcher::{
    build_aggregator, build_providers, ProviderQuery, ProviderState, ProviderStatus,
    SearchAggregator, SearchCategory, SearchError, SearchOutcome, SearchProvider, SearchResult,
};
pub use stream::{StreamEndpoint, StreamEndpointServer};
pub use swarm::{LibrqbitEngine, SwarmEngine, SwarmError, SwarmFile, SwarmHandle};
