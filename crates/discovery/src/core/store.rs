//! The storage contract behind the maintainer and the search engine.
//!
//! Stores are split along the read/write boundary: the search engine only
//! needs a [`ProjectionReader`], while the maintainer needs the full
//! [`ProjectionStore`]. This keeps the engine from ever writing to the
//! projection.

use async_trait::async_trait;

use crate::error::DiscoveryResult;
use crate::types::{GeoPoint, ProviderId, SearchableProviderRecord};

use super::backend::{BackendCapability, BackendKind};

/// Read access to the projection.
///
/// # Radius queries
///
/// [`within_radius`](ProjectionReader::within_radius) must return exactly
/// the active records whose haversine distance to `origin` is at most
/// `radius_km` (within [`DISTANCE_EPSILON_KM`](crate::types::DISTANCE_EPSILON_KM)).
/// Backends are free to pre-filter with an index or a bounding box as long
/// as the exact check runs last. The result is a consistent read: a record
/// is never observed half-updated. Order is unspecified.
#[async_trait]
pub trait ProjectionReader: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Returns the backend type.
    fn kind(&self) -> BackendKind;

    /// Returns the capabilities of this backend.
    fn capabilities(&self) -> &'static [BackendCapability] {
        &[]
    }

    /// Point lookup, including inactive records.
    async fn get(&self, provider_id: &ProviderId) -> DiscoveryResult<Option<SearchableProviderRecord>>;

    /// All active records within `radius_km` of `origin`.
    async fn within_radius(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
    ) -> DiscoveryResult<Vec<SearchableProviderRecord>>;

    /// Number of stored records, active or not.
    async fn count(&self) -> DiscoveryResult<u64>;

    /// Checks that the store can be reached.
    async fn health_check(&self) -> DiscoveryResult<()>;
}

/// Full read/write access to the projection.
///
/// # Versioning
///
/// Every successful [`save`](ProjectionStore::save) assigns the next version
/// (starting at 1) and returns the stored record. `expected_version` is the
/// version the write was based on: `None` means the record must not exist,
/// `Some(v)` means the stored version must still be `v`. Any mismatch fails
/// with [`ConcurrencyError::VersionConflict`](crate::error::ConcurrencyError::VersionConflict)
/// and leaves the stored record untouched.
///
/// Record and index changes are applied atomically.
#[async_trait]
pub trait ProjectionStore: ProjectionReader {
    /// Inserts or replaces a record under optimistic locking.
    async fn save(
        &self,
        record: SearchableProviderRecord,
        expected_version: Option<u64>,
    ) -> DiscoveryResult<SearchableProviderRecord>;

    /// Removes a record and its index entry. Returns `false` if it did not exist.
    async fn remove(&self, provider_id: &ProviderId) -> DiscoveryResult<bool>;
}
