//! Mock search provider for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::searcher::{ProviderError, ProviderQuery, SearchProvider, SearchResult};

/// Mock implementation of the SearchProvider trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable results
/// - Record queries for assertions
/// - Fail, answer late, or never answer at all
///
/// # Example
///
/// ```rust,ignore
/// use swarmstream_core::testing::{MockProvider, fixtures};
///
/// let provider = MockProvider::with_results("tpb", vec![
///     fixtures::search_result("tpb", "Big Buck Bunny", 80),
/// ]);
/// provider.set_delay(Duration::from_millis(200)).await;
///
/// let aggregator = SearchAggregator::new(vec![Arc::new(provider)], Duration::from_secs(5));
/// ```
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    timeout: Option<Duration>,
    results: Arc<RwLock<Vec<SearchResult>>>,
    queries: Arc<RwLock<Vec<ProviderQuery>>>,
    error: Arc<RwLock<Option<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    hang: Arc<RwLock<bool>>,
}

impl MockProvider {
    /// Create a provider that answers with no results.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_results(name, Vec::new())
    }

    /// Create a provider with predefined results.
    pub fn with_results(name: impl Into<String>, results: Vec<SearchResult>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            results: Arc::new(RwLock::new(results)),
            queries: Arc::new(RwLock::new(Vec::new())),
            error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            hang: Arc::new(RwLock::new(false)),
        }
    }

    /// Override the aggregator deadline for this provider.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn set_results(&self, results: Vec<SearchResult>) {
        *self.results.write().await = results;
    }

    /// Fail every search with an API error carrying `message`.
    pub async fn set_error(&self, message: &str) {
        *self.error.write().await = Some(message.to_string());
    }

    pub async fn clear_error(&self) {
        *self.error.write().await = None;
    }

    /// Sleep before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Never answer.
    pub async fn set_hang(&self, hang: bool) {
        *self.hang.write().await = hang;
    }

    /// Queries received so far, in order.
    pub async fn recorded_queries(&self) -> Vec<ProviderQuery> {
        self.queries.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.queries.read().await.len()
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<SearchResult>, ProviderError> {
        self.queries.write().await.push(query.clone());

        if *self.hang.read().await {
            std::future::pending::<()>().await;
        }

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.error.read().await.clone() {
            return Err(ProviderError::ApiError(message));
        }

        let results = self.results.read().await;
        Ok(results
            .iter()
            .take(query.limit() as usize)
            .cloned()
            .collect())
    }
}
