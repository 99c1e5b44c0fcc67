//! Keeps the search projection in step with provider events.
//!
//! Every mutation is a read-modify-write against a [`ProjectionStore`]
//! guarded by the record version. A concurrent write to the same provider
//! makes the save fail with a version conflict; the maintainer then re-reads
//! and re-applies the change, up to `max_update_retries` attempts. Writes to
//! different providers never contend on a version.
//!
//! All operations replace whole attribute groups and skip the write when
//! nothing changed, so redelivered events are harmless.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use locus_discovery::backends::InMemoryStore;
//! use locus_discovery::maintainer::ProjectionMaintainer;
//! use locus_discovery::types::{GeoPoint, ProviderId, ServiceId, SubscriptionTier};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let maintainer = ProjectionMaintainer::new(Arc::new(InMemoryStore::new()));
//! let id = ProviderId::new("prov-1");
//!
//! maintainer
//!     .create(&id, "Ana", GeoPoint::new(-23.55, -46.63)?, SubscriptionTier::Gold)
//!     .await?;
//! let record = maintainer
//!     .update_services(&id, [ServiceId::new("electrician")])
//!     .await?;
//! assert_eq!(record.service_ids().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::DiscoveryConfig;
use crate::core::ProjectionStore;
use crate::error::{ConcurrencyError, DiscoveryResult, RecordError};
use crate::types::{GeoPoint, ProviderId, Rating, SearchableProviderRecord, ServiceId, SubscriptionTier};

/// A provider state change emitted by an upstream module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectionEvent {
    /// The provider became searchable.
    Created {
        /// Provider ID.
        provider_id: ProviderId,
        /// Display name.
        display_name: String,
        /// Service location.
        location: GeoPoint,
        /// Subscription tier.
        tier: SubscriptionTier,
    },

    /// The provider moved.
    LocationChanged {
        /// Provider ID.
        provider_id: ProviderId,
        /// New location.
        location: GeoPoint,
    },

    /// The complete set of offered services changed.
    ServicesChanged {
        /// Provider ID.
        provider_id: ProviderId,
        /// Every service currently offered.
        service_ids: Vec<ServiceId>,
    },

    /// The aggregate rating changed.
    RatingChanged {
        /// Provider ID.
        provider_id: ProviderId,
        /// New average, unset while there are no reviews.
        average_rating: Option<Decimal>,
        /// New review count.
        review_count: i64,
    },

    /// The subscription tier changed.
    TierChanged {
        /// Provider ID.
        provider_id: ProviderId,
        /// New tier.
        tier: SubscriptionTier,
    },

    /// The provider left search (soft removal).
    Deactivated {
        /// Provider ID.
        provider_id: ProviderId,
    },

    /// The provider was removed for good.
    Deleted {
        /// Provider ID.
        provider_id: ProviderId,
    },
}

impl ProjectionEvent {
    /// Returns the provider this event is about.
    pub fn provider_id(&self) -> &ProviderId {
        match self {
            ProjectionEvent::Created { provider_id, .. }
            | ProjectionEvent::LocationChanged { provider_id, .. }
            | ProjectionEvent::ServicesChanged { provider_id, .. }
            | ProjectionEvent::RatingChanged { provider_id, .. }
            | ProjectionEvent::TierChanged { provider_id, .. }
            | ProjectionEvent::Deactivated { provider_id }
            | ProjectionEvent::Deleted { provider_id } => provider_id,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ProjectionEvent::Created { .. } => "created",
            ProjectionEvent::LocationChanged { .. } => "location_changed",
            ProjectionEvent::ServicesChanged { .. } => "services_changed",
            ProjectionEvent::RatingChanged { .. } => "rating_changed",
            ProjectionEvent::TierChanged { .. } => "tier_changed",
            ProjectionEvent::Deactivated { .. } => "deactivated",
            ProjectionEvent::Deleted { .. } => "deleted",
        }
    }
}

/// The only writer of the search projection.
#[derive(Debug)]
pub struct ProjectionMaintainer<S: ProjectionStore> {
    store: Arc<S>,
    max_retries: u32,
}

impl<S: ProjectionStore> Clone for ProjectionMaintainer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_retries: self.max_retries,
        }
    }
}

impl<S: ProjectionStore> ProjectionMaintainer<S> {
    /// Creates a maintainer with the default retry budget.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &DiscoveryConfig::default())
    }

    /// Creates a maintainer using `config.max_update_retries`.
    pub fn with_config(store: Arc<S>, config: &DiscoveryConfig) -> Self {
        Self {
            store,
            max_retries: config.max_update_retries.max(1),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Looks up the current record, active or not.
    pub async fn get(&self, provider_id: &ProviderId) -> DiscoveryResult<Option<SearchableProviderRecord>> {
        self.store.get(provider_id).await
    }

    /// Makes a provider searchable.
    ///
    /// Fails with [`RecordError::Duplicate`] when an active record exists. An
    /// inactive record is reactivated with every attribute overwritten: the
    /// service set is emptied and the rating cleared.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn create(
        &self,
        provider_id: &ProviderId,
        display_name: impl Into<String>,
        location: GeoPoint,
        tier: SubscriptionTier,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        provider_id.validate()?;
        let display_name = display_name.into();

        for attempt in 1..=self.max_retries {
            let existing = self.store.get(provider_id).await?;
            let expected = match &existing {
                Some(record) if record.is_active() => {
                    warn!("create for an already active provider");
                    return Err(RecordError::Duplicate {
                        provider_id: provider_id.clone(),
                    }
                    .into());
                }
                Some(record) => Some(record.version()),
                None => None,
            };

            let fresh = SearchableProviderRecord::new(
                provider_id.clone(),
                display_name.clone(),
                location,
                tier,
            );
            match self.store.save(fresh, expected).await {
                Ok(saved) => {
                    debug!(reactivated = expected.is_some(), version = saved.version(), "provider created");
                    return Ok(saved);
                }
                Err(e) if e.is_version_conflict() => {
                    debug!(attempt, "version conflict on create, retrying");
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(self.exhausted(provider_id))
    }

    /// Replaces the location.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn update_location(
        &self,
        provider_id: &ProviderId,
        location: GeoPoint,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        self.modify_existing(provider_id, |r| r.set_location(location)).await
    }

    /// Replaces the full offered-service set. Duplicates collapse.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn update_services(
        &self,
        provider_id: &ProviderId,
        service_ids: impl IntoIterator<Item = ServiceId>,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        let services: BTreeSet<ServiceId> = service_ids.into_iter().collect();
        for service in &services {
            service.validate()?;
        }
        self.modify_existing(provider_id, |r| r.set_services(services.clone()))
            .await
    }

    /// Replaces the average rating and review count together.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn update_rating(
        &self,
        provider_id: &ProviderId,
        average_rating: Option<Decimal>,
        review_count: i64,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        let rating = Rating::new(average_rating, review_count)?;
        self.modify_existing(provider_id, |r| r.set_rating(rating)).await
    }

    /// Replaces the subscription tier.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn update_tier(
        &self,
        provider_id: &ProviderId,
        tier: SubscriptionTier,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        self.modify_existing(provider_id, |r| r.set_tier(tier)).await
    }

    /// Removes the provider from search but keeps its record.
    ///
    /// Unknown providers are ignored. Returns the record when one exists.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn deactivate(
        &self,
        provider_id: &ProviderId,
    ) -> DiscoveryResult<Option<SearchableProviderRecord>> {
        let result = self.modify(provider_id, |r| r.set_active(false)).await?;
        if result.is_none() {
            debug!("deactivate for unknown provider ignored");
        }
        Ok(result)
    }

    /// Removes the record and its index entry. Returns `false` if it did not exist.
    #[instrument(level = "debug", skip_all, fields(provider_id = %provider_id))]
    pub async fn delete(&self, provider_id: &ProviderId) -> DiscoveryResult<bool> {
        provider_id.validate()?;
        let removed = self.store.remove(provider_id).await?;
        debug!(removed, "provider deleted");
        Ok(removed)
    }

    /// Applies one upstream event.
    #[instrument(level = "debug", skip_all, fields(provider_id = %event.provider_id(), event = event.name()))]
    pub async fn apply(&self, event: ProjectionEvent) -> DiscoveryResult<()> {
        match event {
            ProjectionEvent::Created {
                provider_id,
                display_name,
                location,
                tier,
            } => {
                self.create(&provider_id, display_name, location, tier).await?;
            }
            ProjectionEvent::LocationChanged {
                provider_id,
                location,
            } => {
                self.update_location(&provider_id, location).await?;
            }
            ProjectionEvent::ServicesChanged {
                provider_id,
                service_ids,
            } => {
                self.update_services(&provider_id, service_ids).await?;
            }
            ProjectionEvent::RatingChanged {
                provider_id,
                average_rating,
                review_count,
            } => {
                self.update_rating(&provider_id, average_rating, review_count)
                    .await?;
            }
            ProjectionEvent::TierChanged { provider_id, tier } => {
                self.update_tier(&provider_id, tier).await?;
            }
            ProjectionEvent::Deactivated { provider_id } => {
                self.deactivate(&provider_id).await?;
            }
            ProjectionEvent::Deleted { provider_id } => {
                self.delete(&provider_id).await?;
            }
        }
        Ok(())
    }

    async fn modify_existing<F>(
        &self,
        provider_id: &ProviderId,
        change: F,
    ) -> DiscoveryResult<SearchableProviderRecord>
    where
        F: FnMut(&mut SearchableProviderRecord) -> bool + Send,
    {
        match self.modify(provider_id, change).await? {
            Some(record) => Ok(record),
            None => {
                warn!("update for unknown provider");
                Err(RecordError::NotFound {
                    provider_id: provider_id.clone(),
                }
                .into())
            }
        }
    }

    /// Read-modify-write with retry. `change` reports whether it altered the
    /// record; unchanged records are not written. `None` when the record is absent.
    async fn modify<F>(
        &self,
        provider_id: &ProviderId,
        mut change: F,
    ) -> DiscoveryResult<Option<SearchableProviderRecord>>
    where
        F: FnMut(&mut SearchableProviderRecord) -> bool + Send,
    {
        provider_id.validate()?;

        for attempt in 1..=self.max_retries {
            let Some(mut record) = self.store.get(provider_id).await? else {
                return Ok(None);
            };

            if !change(&mut record) {
                debug!(version = record.version(), "no change");
                return Ok(Some(record));
            }
            record.touch();

            let expected = record.version();
            match self.store.save(record, Some(expected)).await {
                Ok(saved) => {
                    debug!(version = saved.version(), "projection updated");
                    return Ok(Some(saved));
                }
                Err(e) if e.is_version_conflict() => {
                    debug!(attempt, "version conflict, retrying");
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(self.exhausted(provider_id))
    }

    fn exhausted(&self, provider_id: &ProviderId) -> crate::error::DiscoveryError {
        warn!(attempts = self.max_retries, "giving up after repeated version conflicts");
        ConcurrencyError::RetriesExhausted {
            provider_id: provider_id.clone(),
            attempts: self.max_retries,
        }
        .into()
    }
}
