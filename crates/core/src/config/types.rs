use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

/// Search aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Per-provider deadline in seconds (default: 5)
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u32,
    /// Result limit used when the request doesn't specify one (default: 10)
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Upper bound for requested limits (default: 100)
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    /// Providers in registration order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            providers: Vec::new(),
        }
    }
}

fn default_search_timeout() -> u32 {
    5
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

/// Available provider backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// The Pirate Bay JSON API (apibay.org and mirrors)
    Apibay,
    /// torrents-csv.com search service
    TorrentsCsv,
    /// A single indexer exposed through a Jackett server
    Jackett,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Apibay => "apibay",
            ProviderKind::TorrentsCsv => "torrents_csv",
            ProviderKind::Jackett => "jackett",
        }
    }
}

/// A single search provider entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Display name, reported in results and provider status
    pub name: String,
    pub kind: ProviderKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL (e.g., "https://apibay.org", "http://localhost:9117")
    pub url: String,
    /// API key (jackett only)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Jackett indexer id (jackett only)
    #[serde(default)]
    pub indexer: Option<String>,
    /// Overrides `search.timeout_secs` for this provider
    #[serde(default)]
    pub timeout_secs: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

/// Playback session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Deadline for swarm metadata in seconds (default: 30)
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,
    /// Where session pieces are written; each session gets its own subfolder
    #[serde(default = "default_download_path")]
    pub download_path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enable_dht: bool,
    /// Peer listen port (librqbit picks one when unset)
    #[serde(default)]
    pub listen_port: Option<u16>,
    /// Address stream endpoints bind to
    #[serde(default = "default_stream_bind_host")]
    pub stream_bind_host: IpAddr,
    /// Host written into stream URLs (defaults to the bind host, loopback
    /// for a wildcard bind)
    #[serde(default)]
    pub stream_public_host: Option<String>,
    /// 0 = fresh ephemeral port per session. A fixed port limits the
    /// service to one concurrent stream.
    #[serde(default)]
    pub stream_port: u16,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            metadata_timeout_secs: default_metadata_timeout(),
            download_path: default_download_path(),
            enable_dht: true,
            listen_port: None,
            stream_bind_host: default_stream_bind_host(),
            stream_public_host: None,
            stream_port: 0,
        }
    }
}

impl PlaybackConfig {
    /// Host used when building stream URLs.
    ///
    /// Without `stream_public_host` this is the bind host, except that a
    /// wildcard bind (`0.0.0.0`, `::`) maps to the loopback address of the
    /// same family.
    pub fn public_host(&self) -> String {
        if let Some(host) = self
            .stream_public_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
        {
            return host.to_string();
        }
        match self.stream_bind_host {
            IpAddr::V4(ip) if ip.is_unspecified() => Ipv4Addr::LOCALHOST.to_string(),
            IpAddr::V6(ip) if ip.is_unspecified() => Ipv6Addr::LOCALHOST.to_string(),
            ip => ip.to_string(),
        }
    }
}

fn default_metadata_timeout() -> u64 {
    30
}

fn default_download_path() -> PathBuf {
    std::env::temp_dir().join("swarmstream")
}

fn default_stream_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub search: SanitizedSearchConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSearchConfig {
    pub timeout_secs: u32,
    pub default_limit: u32,
    pub max_limit: u32,
    pub providers: Vec<SanitizedProviderConfig>,
}

/// Sanitized provider config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub name: String,
    pub kind: String,
    pub enabled: bool,
    pub url: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexer: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            search: SanitizedSearchConfig {
                timeout_secs: config.search.timeout_secs,
                default_limit: config.search.default_limit,
                max_limit: config.search.max_limit,
                providers: config
                    .search
                    .providers
                    .iter()
                    .map(|p| SanitizedProviderConfig {
                        name: p.name.clone(),
                        kind: p.kind.as_str().to_string(),
                        enabled: p.enabled,
                        url: p.url.clone(),
                        api_key_configured: p
                            .api_key
                            .as_ref()
                            .map(|k| !k.is_empty())
                            .unwrap_or(false),
                        indexer: p.indexer.clone(),
                    })
                    .collect(),
            },
            playback: config.playback.clone(),
        }
    }
}
