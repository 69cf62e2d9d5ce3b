//! Concurrent fan-out over every enabled provider.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{
    ProviderQuery, ProviderState, ProviderStatus, SearchError, SearchOutcome, SearchProvider,
    SearchResult,
};
use crate::metrics::{PROVIDER_DURATION, PROVIDER_REQUESTS, SEARCH_REQUESTS, SEARCH_RESULTS};

/// Queries all providers concurrently and merges what comes back in time.
///
/// The provider list is fixed at construction and shared read-only; a search
/// call writes no shared state.
pub struct SearchAggregator {
    providers: Vec<Arc<dyn SearchProvider>>,
    provider_timeout: Duration,
}

impl SearchAggregator {
    /// `provider_timeout` applies to providers that don't set their own.
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>, provider_timeout: Duration) -> Self {
        Self {
            providers,
            provider_timeout,
        }
    }

    /// Names of the enabled providers, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Run `query` against every provider.
    ///
    /// Each provider is bounded by its own deadline. A provider that errors or
    /// runs out of time contributes nothing and is reported in
    /// [`SearchOutcome::providers`]. Results are concatenated in registration
    /// order, keeping each provider's own ranking, then truncated to the query
    /// limit. Fails only when no provider answered.
    pub async fn search(&self, query: &ProviderQuery) -> Result<SearchOutcome, SearchError> {
        if self.providers.is_empty() {
            SEARCH_REQUESTS.with_label_values(&["failed"]).inc();
            return Err(SearchError::NoProviders);
        }

        let start = Instant::now();

        debug!(
            providers = self.providers.len(),
            query = %query.text(),
            category = %query.category(),
            "Starting parallel search"
        );

        let search_futures: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let deadline = provider.timeout().unwrap_or(self.provider_timeout);
                async move {
                    let started = Instant::now();
                    let outcome = tokio::time::timeout(deadline, provider.search(query)).await;
                    (provider.name().to_string(), outcome, started.elapsed())
                }
            })
            .collect();

        // join_all keeps input order, so merging below follows registration order
        let outcomes = futures::future::join_all(search_futures).await;

        let mut results: Vec<SearchResult> = Vec::new();
        let mut statuses: Vec<ProviderStatus> = Vec::with_capacity(outcomes.len());

        for (name, outcome, elapsed) in outcomes {
            let duration_ms = elapsed.as_millis() as u64;
            PROVIDER_DURATION
                .with_label_values(&[&name])
                .observe(elapsed.as_secs_f64());

            match outcome {
                Ok(Ok(mut hits)) => {
                    PROVIDER_REQUESTS.with_label_values(&[&name, "ok"]).inc();
                    let answered = hits.len();
                    hits.retain(SearchResult::is_actionable);
                    debug!(
                        provider = %name,
                        results = hits.len(),
                        dropped = answered - hits.len(),
                        duration_ms,
                        "Provider answered"
                    );
                    statuses.push(ProviderStatus {
                        name,
                        state: ProviderState::Ok,
                        result_count: hits.len(),
                        error: None,
                        duration_ms,
                    });
                    results.append(&mut hits);
                }
                Ok(Err(e)) => {
                    PROVIDER_REQUESTS
                        .with_label_values(&[&name, "unavailable"])
                        .inc();
                    warn!(provider = %name, error = %e, "Provider unavailable");
                    statuses.push(ProviderStatus {
                        name,
                        state: ProviderState::Unavailable,
                        result_count: 0,
                        error: Some(e.to_string()),
                        duration_ms,
                    });
                }
                Err(_) => {
                    PROVIDER_REQUESTS
                        .with_label_values(&[&name, "timed_out"])
                        .inc();
                    warn!(provider = %name, duration_ms, "Provider exceeded its deadline");
                    statuses.push(ProviderStatus {
                        name,
                        state: ProviderState::TimedOut,
                        result_count: 0,
                        error: Some("Request timeout".to_string()),
                        duration_ms,
                    });
                }
            }
        }

        if statuses.iter().all(|s| s.state != ProviderState::Ok) {
            SEARCH_REQUESTS.with_label_values(&["failed"]).inc();
            return Err(SearchError::AllProvidersFailed(statuses));
        }

        results.truncate(query.limit() as usize);

        let duration_ms = start.elapsed().as_millis() as u64;
        SEARCH_REQUESTS.with_label_values(&["ok"]).inc();
        SEARCH_RESULTS.with_label_values(&[]).observe(results.len() as f64);

        debug!(results = results.len(), duration_ms, "Search complete");

        Ok(SearchOutcome {
            results,
            providers: statuses,
            duration_ms,
        })
    }
}
