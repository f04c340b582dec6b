//! Bulk discovery of mirror definitions

use std::time::{Duration, Instant};

use mirror_store::ResourceStore;
use tokio_util::sync::CancellationToken;

use super::{RegisterOutcome, RegistryInner};

/// Result of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Definitions that produced a new or replaced provider
    pub registered: usize,
    /// Definitions identical to the provider already registered
    pub unchanged: usize,
    /// Definitions rejected by validation
    pub invalid: usize,
    /// Valid definitions the host refused to bind
    pub failed: usize,
    /// Queries the store could not run
    pub failed_queries: usize,
    /// Whether the pass stopped early because it was cancelled
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl DiscoverySummary {
    fn record(&mut self, outcome: RegisterOutcome) {
        match outcome {
            RegisterOutcome::Registered => self.registered += 1,
            RegisterOutcome::Unchanged => self.unchanged += 1,
            RegisterOutcome::Invalid => self.invalid += 1,
            RegisterOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of definitions looked at.
    pub fn definitions(&self) -> usize {
        self.registered + self.unchanged + self.invalid + self.failed
    }
}

impl RegistryInner {
    /// Run every configured query and register each result.
    ///
    /// One bad definition or failing query never aborts the pass. The
    /// token is checked before each query and each definition; providers
    /// registered before cancellation stay registered.
    pub(super) fn discover(&self, store: &dyn ResourceStore, cancel: &CancellationToken) -> DiscoverySummary {
        let started = Instant::now();
        let mut summary = DiscoverySummary::default();

        'queries: for query in &self.config.discovery_queries {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let definitions = match store.find_resources(query.language(), query.query()) {
                Ok(definitions) => definitions,
                Err(e) => {
                    tracing::error!(query = %query, "Discovery query failed: {}", e);
                    summary.failed_queries += 1;
                    continue;
                }
            };
            tracing::debug!(query = %query, found = definitions.len(), "Discovery query returned");

            for definition in &definitions {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'queries;
                }
                summary.record(self.register(definition));
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            registered = summary.registered,
            unchanged = summary.unchanged,
            invalid = summary.invalid,
            failed = summary.failed,
            failed_queries = summary.failed_queries,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Registered {} mirror providers in {}ms",
            summary.registered,
            summary.elapsed.as_millis()
        );
        summary
    }
}
