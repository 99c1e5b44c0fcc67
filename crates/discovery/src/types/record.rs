//! The denormalized, search-optimized projection of a provider.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::geo::GeoPoint;
use super::ids::{ProviderId, ServiceId};
use super::rating::Rating;
use super::tier::SubscriptionTier;

/// A provider as seen by search.
///
/// Records are written only by the
/// [`ProjectionMaintainer`](crate::maintainer::ProjectionMaintainer) and read
/// by the [`SearchEngine`](crate::engine::SearchEngine). The `version` is
/// assigned by the store on every successful save and drives optimistic
/// locking; a record that has never been saved has version 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableProviderRecord {
    provider_id: ProviderId,
    display_name: String,
    location: GeoPoint,
    service_ids: BTreeSet<ServiceId>,
    rating: Rating,
    tier: SubscriptionTier,
    is_active: bool,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl SearchableProviderRecord {
    /// Creates an active, unsaved record with no services and no rating.
    pub fn new(
        provider_id: ProviderId,
        display_name: impl Into<String>,
        location: GeoPoint,
        tier: SubscriptionTier,
    ) -> Self {
        Self {
            provider_id,
            display_name: display_name.into(),
            location,
            service_ids: BTreeSet::new(),
            rating: Rating::unrated(),
            tier,
            is_active: true,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Rebuilds a record read back from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        provider_id: ProviderId,
        display_name: String,
        location: GeoPoint,
        service_ids: BTreeSet<ServiceId>,
        rating: Rating,
        tier: SubscriptionTier,
        is_active: bool,
        version: u64,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_id,
            display_name,
            location,
            service_ids,
            rating,
            tier,
            is_active,
            version,
            updated_at,
        }
    }

    /// Replaces the offered service set.
    pub fn with_services(mut self, services: impl IntoIterator<Item = ServiceId>) -> Self {
        self.service_ids = services.into_iter().collect();
        self
    }

    /// Sets the rating.
    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = rating;
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// The provider this record shadows.
    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    /// Name shown in results.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Service location.
    pub fn location(&self) -> &GeoPoint {
        &self.location
    }

    /// Services currently offered.
    pub fn service_ids(&self) -> &BTreeSet<ServiceId> {
        &self.service_ids
    }

    /// Aggregate rating.
    pub fn rating(&self) -> &Rating {
        &self.rating
    }

    /// Shorthand for `rating().average()`.
    pub fn average_rating(&self) -> Option<Decimal> {
        self.rating.average()
    }

    /// Shorthand for `rating().review_count()`.
    pub fn review_count(&self) -> u64 {
        self.rating.review_count()
    }

    /// Subscription tier.
    pub fn tier(&self) -> SubscriptionTier {
        self.tier
    }

    /// Whether the provider is eligible for search.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Store-assigned version, 0 before the first save.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Time of the last change.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` if the provider offers at least one of `wanted`.
    pub fn offers_any(&self, wanted: &BTreeSet<ServiceId>) -> bool {
        // Iterate the smaller set.
        if wanted.len() < self.service_ids.len() {
            wanted.iter().any(|s| self.service_ids.contains(s))
        } else {
            self.service_ids.iter().any(|s| wanted.contains(s))
        }
    }

    /// Compares every searchable attribute, ignoring version and timestamp.
    pub fn same_attributes(&self, other: &SearchableProviderRecord) -> bool {
        self.provider_id == other.provider_id
            && self.display_name == other.display_name
            && self.location == other.location
            && self.service_ids == other.service_ids
            && self.rating == other.rating
            && self.tier == other.tier
            && self.is_active == other.is_active
    }

    // Mutators used by the maintainer. Each returns whether anything changed.

    pub(crate) fn set_location(&mut self, location: GeoPoint) -> bool {
        if self.location == location {
            return false;
        }
        self.location = location;
        true
    }

    pub(crate) fn set_services(&mut self, services: BTreeSet<ServiceId>) -> bool {
        if self.service_ids == services {
            return false;
        }
        self.service_ids = services;
        true
    }

    pub(crate) fn set_rating(&mut self, rating: Rating) -> bool {
        if self.rating == rating {
            return false;
        }
        self.rating = rating;
        true
    }

    pub(crate) fn set_tier(&mut self, tier: SubscriptionTier) -> bool {
        if self.tier == tier {
            return false;
        }
        self.tier = tier;
        true
    }

    pub(crate) fn set_active(&mut self, is_active: bool) -> bool {
        if self.is_active == is_active {
            return false;
        }
        self.is_active = is_active;
        true
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Stamps the version assigned by a store on save.
    pub(crate) fn stamp_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}
