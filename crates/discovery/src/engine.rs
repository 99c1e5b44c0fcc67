//! The ranking and filtering engine.
//!
//! A search runs one radius query against the store and then does the rest
//! in memory: filter, rank, count, slice. The engine holds no mutable state,
//! so any number of searches can run concurrently over a shared instance.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use locus_discovery::backends::InMemoryStore;
//! use locus_discovery::engine::SearchEngine;
//! use locus_discovery::maintainer::ProjectionMaintainer;
//! use locus_discovery::types::{GeoPoint, ProviderId, SearchCriteria, SubscriptionTier};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let maintainer = ProjectionMaintainer::new(Arc::clone(&store));
//! let engine = SearchEngine::new(Arc::clone(&store));
//!
//! let sao_paulo = GeoPoint::new(-23.5505, -46.6333)?;
//! maintainer
//!     .create(&ProviderId::new("a"), "A", GeoPoint::new(-23.5555, -46.6383)?, SubscriptionTier::Silver)
//!     .await?;
//!
//! let result = engine.search(&SearchCriteria::builder(sao_paulo, 10.0).build()?).await?;
//! assert_eq!(result.total_matches, 1);
//! assert!(result.items[0].distance_km < 1.0);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::DiscoveryConfig;
use crate::core::ProjectionReader;
use crate::error::{BackendError, DiscoveryError, DiscoveryResult, SearchAborted};
use crate::ranking;
use crate::types::{
    GeoPoint, RankedProvider, SearchCriteria, SearchCriteriaBuilder, SearchResult,
    SearchableProviderRecord,
};

/// Read-only search over a projection store.
#[derive(Debug)]
pub struct SearchEngine<R: ProjectionReader> {
    reader: Arc<R>,
    config: DiscoveryConfig,
}

impl<R: ProjectionReader> Clone for SearchEngine<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            config: self.config.clone(),
        }
    }
}

impl<R: ProjectionReader> SearchEngine<R> {
    /// Creates an engine with the default configuration.
    pub fn new(reader: Arc<R>) -> Self {
        Self::with_config(reader, DiscoveryConfig::default())
    }

    /// Creates an engine with a custom configuration.
    pub fn with_config(reader: Arc<R>, config: DiscoveryConfig) -> Self {
        Self { reader, config }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Starts a criteria builder honouring the configured page sizes.
    pub fn criteria(&self, origin: GeoPoint, radius_km: f64) -> SearchCriteriaBuilder {
        SearchCriteria::builder(origin, radius_km)
            .max_page_size(self.config.effective_max_page_size())
            .page_size(i64::from(self.config.default_page_size))
    }

    /// Runs one search.
    ///
    /// Only the radius query touches the store. Store failures that mean the
    /// backend could not be reached come back with the
    /// [`StorageUnavailable`](crate::error::ErrorKind::StorageUnavailable) kind.
    #[instrument(
        level = "debug",
        skip_all,
        fields(radius_km = criteria.radius_km(), skip = criteria.skip(), take = criteria.take())
    )]
    pub async fn search(&self, criteria: &SearchCriteria) -> DiscoveryResult<SearchResult> {
        let candidates = self.fetch(criteria).await?;
        Ok(self.assemble(criteria, candidates))
    }

    /// Runs a search, giving up at the storage call after `timeout`.
    pub async fn search_with_timeout(
        &self,
        criteria: &SearchCriteria,
        timeout: Duration,
    ) -> DiscoveryResult<SearchResult> {
        match tokio::time::timeout(timeout, self.fetch(criteria)).await {
            Ok(candidates) => Ok(self.assemble(criteria, candidates?)),
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "search timed out");
                Err(SearchAborted::TimedOut { timeout_ms }.into())
            }
        }
    }

    /// Runs a search with the configured `search_timeout`.
    pub async fn search_with_default_timeout(
        &self,
        criteria: &SearchCriteria,
    ) -> DiscoveryResult<SearchResult> {
        self.search_with_timeout(criteria, self.config.search_timeout)
            .await
    }

    /// Runs a search that stops as soon as `cancel` completes.
    ///
    /// Cancellation is observed while the storage call is in flight; once
    /// candidates are in hand the search always finishes.
    pub async fn search_until<C>(
        &self,
        criteria: &SearchCriteria,
        cancel: C,
    ) -> DiscoveryResult<SearchResult>
    where
        C: Future<Output = ()> + Send,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                debug!("search cancelled");
                Err(SearchAborted::Cancelled.into())
            }
            candidates = self.fetch(criteria) => Ok(self.assemble(criteria, candidates?)),
        }
    }

    /// Checks that the store can be reached.
    pub async fn health_check(&self) -> DiscoveryResult<()> {
        self.reader
            .health_check()
            .await
            .map_err(|e| self.unavailable(e))
    }

    async fn fetch(&self, criteria: &SearchCriteria) -> DiscoveryResult<Vec<SearchableProviderRecord>> {
        self.reader
            .within_radius(criteria.origin(), criteria.radius_km())
            .await
            .map_err(|e| self.unavailable(e))
    }

    fn assemble(
        &self,
        criteria: &SearchCriteria,
        candidates: Vec<SearchableProviderRecord>,
    ) -> SearchResult {
        let candidate_count = candidates.len();

        // The store's answer is re-checked so a loose backend cannot widen the radius.
        let mut hits: Vec<RankedProvider> = candidates
            .into_iter()
            .filter_map(|record| ranking::evaluate(record, criteria))
            .collect();
        ranking::rank(&mut hits);

        let total_matches = hits.len() as u64;
        let skip = usize::try_from(criteria.skip()).unwrap_or(usize::MAX);
        let items: Vec<RankedProvider> = if skip >= hits.len() {
            Vec::new()
        } else {
            hits.into_iter()
                .skip(skip)
                .take(criteria.take() as usize)
                .collect()
        };

        debug!(
            backend = self.reader.backend_name(),
            candidates = candidate_count,
            total_matches,
            returned = items.len(),
            "search completed"
        );

        SearchResult {
            items,
            total_matches,
            skip: criteria.skip(),
            take: criteria.take(),
        }
    }

    /// Normalises unreachable-backend failures to [`BackendError::Unavailable`].
    fn unavailable(&self, err: DiscoveryError) -> DiscoveryError {
        match err {
            DiscoveryError::Backend(e) if e.is_unavailable() => {
                warn!(backend = self.reader.backend_name(), error = %e, "storage unavailable");
                DiscoveryError::Backend(BackendError::Unavailable {
                    backend_name: self.reader.backend_name().to_string(),
                    message: e.to_string(),
                })
            }
            other => other,
        }
    }
}
