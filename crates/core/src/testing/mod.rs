//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external service traits
//! (search providers and the swarm engine), allowing end-to-end testing
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use swarmstream_core::testing::{fixtures, MockProvider, MockSwarmEngine};
//!
//! let provider = MockProvider::with_results("tpb", vec![
//!     fixtures::search_result("tpb", "Big Buck Bunny", 80),
//! ]);
//! let engine = MockSwarmEngine::new();
//! engine.add_swarm(&fixtures::magnet("dd82..."), vec![("movie.mp4".into(), vec![0; 64])]).await;
//! ```

mod mock_provider;
mod mock_swarm;

pub use mock_provider::MockProvider;
pub use mock_swarm::{MetadataBehavior, MockSwarmEngine};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::searcher::{format_size, magnet_uri, SearchResult};
    use crate::swarm::SwarmFile;

    /// Create a search result with reasonable defaults.
    pub fn search_result(provider: &str, title: &str, seeds: u32) -> SearchResult {
        let size_bytes = 1024 * 1024 * 700;
        SearchResult {
            title: title.to_string(),
            size: format_size(size_bytes),
            size_bytes: Some(size_bytes),
            seeds,
            peers: seeds / 2,
            provider: provider.to_string(),
            download_link: None,
            description_page: None,
            swarm_descriptor: Some(magnet_uri(
                &format!("{:0>40}", title.len()),
                title,
                &[],
            )),
            time: None,
        }
    }

    /// A magnet URI for `info_hash`.
    pub fn magnet(info_hash: &str) -> String {
        format!("magnet:?xt=urn:btih:{}", info_hash)
    }

    /// File entries from `(path, size)` pairs.
    pub fn swarm_files(entries: &[(&str, u64)]) -> Vec<SwarmFile> {
        entries
            .iter()
            .map(|(path, size)| SwarmFile::new(*path, *size))
            .collect()
    }
}
