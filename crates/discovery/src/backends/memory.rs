//! In-process projection store.
//!
//! Records live in a hash map next to a grid-cell spatial index. Both sit
//! behind a single [`parking_lot::RwLock`], so a save updates the record and
//! its index entry in one critical section and readers never see one
//! without the other.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::DiscoveryConfig;
use crate::core::{BackendCapability, BackendKind, ProjectionReader, ProjectionStore};
use crate::error::{ConcurrencyError, DiscoveryResult};
use crate::types::{
    BoundingBox, DISTANCE_EPSILON_KM, GeoPoint, ProviderId, SearchableProviderRecord,
};

/// Default grid cell edge in degrees.
pub const DEFAULT_CELL_DEGREES: f64 = 0.25;

type Cell = (i32, i32);

/// Fixed-size lat/lon grid mapping cells to the active providers inside them.
#[derive(Debug)]
struct GridIndex {
    cell_degrees: f64,
    cells: HashMap<Cell, HashSet<ProviderId>>,
}

impl GridIndex {
    fn new(cell_degrees: f64) -> Self {
        Self {
            cell_degrees,
            cells: HashMap::new(),
        }
    }

    fn coord(&self, degrees: f64) -> i32 {
        (degrees / self.cell_degrees).floor() as i32
    }

    fn cell_of(&self, point: &GeoPoint) -> Cell {
        (self.coord(point.latitude()), self.coord(point.longitude()))
    }

    fn insert(&mut self, point: &GeoPoint, id: ProviderId) {
        let cell = self.cell_of(point);
        self.cells.entry(cell).or_default().insert(id);
    }

    fn remove(&mut self, point: &GeoPoint, id: &ProviderId) {
        let cell = self.cell_of(point);
        if let Some(ids) = self.cells.get_mut(&cell) {
            ids.remove(id);
            if ids.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Providers in every cell overlapping the box.
    fn candidates(&self, bbox: &BoundingBox) -> HashSet<&ProviderId> {
        let lat_range = (self.coord(bbox.min_lat), self.coord(bbox.max_lat));
        let mut out = HashSet::new();

        for span in bbox.spans() {
            let lon_range = (self.coord(span.min), self.coord(span.max));
            let width = i64::from(lon_range.1) - i64::from(lon_range.0) + 1;
            let height = i64::from(lat_range.1) - i64::from(lat_range.0) + 1;

            if width.saturating_mul(height) > self.cells.len() as i64 {
                // Fewer occupied cells than cells in range: walk the occupied ones.
                for ((lat, lon), ids) in &self.cells {
                    if (lat_range.0..=lat_range.1).contains(lat)
                        && (lon_range.0..=lon_range.1).contains(lon)
                    {
                        out.extend(ids.iter());
                    }
                }
            } else {
                for lat in lat_range.0..=lat_range.1 {
                    for lon in lon_range.0..=lon_range.1 {
                        if let Some(ids) = self.cells.get(&(lat, lon)) {
                            out.extend(ids.iter());
                        }
                    }
                }
            }
        }
        out
    }

    fn indexed_len(&self) -> usize {
        self.cells.values().map(HashSet::len).sum()
    }
}

#[derive(Debug)]
struct MemoryState {
    records: HashMap<ProviderId, SearchableProviderRecord>,
    grid: GridIndex,
}

/// A projection store held entirely in memory.
///
/// Only active records are indexed; deactivated ones stay retrievable by id.
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with the default grid cell size.
    pub fn new() -> Self {
        Self::with_cell_degrees(DEFAULT_CELL_DEGREES)
    }

    /// Creates an empty store with a custom grid cell size.
    ///
    /// Non-positive or non-finite sizes fall back to [`DEFAULT_CELL_DEGREES`].
    pub fn with_cell_degrees(cell_degrees: f64) -> Self {
        let cell_degrees = if cell_degrees.is_finite() && cell_degrees > 0.0 {
            cell_degrees
        } else {
            tracing::warn!(cell_degrees, "invalid grid cell size, using default");
            DEFAULT_CELL_DEGREES
        };
        Self {
            state: RwLock::new(MemoryState {
                records: HashMap::new(),
                grid: GridIndex::new(cell_degrees),
            }),
        }
    }

    /// Creates an empty store sized by `config.grid_cell_degrees`.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::with_cell_degrees(config.grid_cell_degrees)
    }

    /// Number of records currently present in the spatial index.
    pub fn indexed_len(&self) -> usize {
        self.state.read().grid.indexed_len()
    }
}

#[async_trait]
impl ProjectionReader for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn capabilities(&self) -> &'static [BackendCapability] {
        &[
            BackendCapability::IndexedRadiusQuery,
            BackendCapability::OptimisticLocking,
        ]
    }

    async fn get(
        &self,
        provider_id: &ProviderId,
    ) -> DiscoveryResult<Option<SearchableProviderRecord>> {
        Ok(self.state.read().records.get(provider_id).cloned())
    }

    async fn within_radius(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
    ) -> DiscoveryResult<Vec<SearchableProviderRecord>> {
        let bbox = BoundingBox::around(origin, radius_km);
        let state = self.state.read();

        let matches: Vec<_> = state
            .grid
            .candidates(&bbox)
            .into_iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| {
                r.is_active() && r.location().distance_km(origin) <= radius_km + DISTANCE_EPSILON_KM
            })
            .cloned()
            .collect();

        tracing::trace!(radius_km, matches = matches.len(), "memory radius query");
        Ok(matches)
    }

    async fn count(&self) -> DiscoveryResult<u64> {
        Ok(self.state.read().records.len() as u64)
    }

    async fn health_check(&self) -> DiscoveryResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProjectionStore for InMemoryStore {
    async fn save(
        &self,
        record: SearchableProviderRecord,
        expected_version: Option<u64>,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        let mut state = self.state.write();
        let MemoryState { records, grid } = &mut *state;

        let current = records.get(record.provider_id());
        let actual = current.map(|r| r.version());
        if actual != expected_version {
            return Err(ConcurrencyError::VersionConflict {
                provider_id: record.provider_id().clone(),
                expected: expected_version.unwrap_or(0),
                actual: actual.unwrap_or(0),
            }
            .into());
        }

        if let Some(old) = current.filter(|r| r.is_active()) {
            grid.remove(old.location(), old.provider_id());
        }

        let stored = record.stamp_version(actual.unwrap_or(0) + 1);
        if stored.is_active() {
            grid.insert(stored.location(), stored.provider_id().clone());
        }
        records.insert(stored.provider_id().clone(), stored.clone());

        Ok(stored)
    }

    async fn remove(&self, provider_id: &ProviderId) -> DiscoveryResult<bool> {
        let mut state = self.state.write();
        let MemoryState { records, grid } = &mut *state;

        match records.remove(provider_id) {
            Some(old) => {
                if old.is_active() {
                    grid.remove(old.location(), provider_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubscriptionTier;

    fn record(id: &str, lat: f64, lon: f64) -> SearchableProviderRecord {
        SearchableProviderRecord::new(
            ProviderId::new(id),
            id,
            GeoPoint::new(lat, lon).unwrap(),
            SubscriptionTier::Free,
        )
    }

    #[tokio::test]
    async fn test_save_assigns_versions() {
        let store = InMemoryStore::new();
        let v1 = store.save(record("a", 0.0, 0.0), None).await.unwrap();
        assert_eq!(v1.version(), 1);
        let v2 = store.save(v1.clone(), Some(1)).await.unwrap();
        assert_eq!(v2.version(), 2);

        let stale = store.save(v1, Some(1)).await.unwrap_err();
        assert!(stale.is_version_conflict());
        assert_eq!(store.get(&ProviderId::new("a")).await.unwrap().unwrap().version(), 2);
    }

    #[tokio::test]
    async fn test_insert_requires_absence() {
        let store = InMemoryStore::new();
        store.save(record("a", 0.0, 0.0), None).await.unwrap();
        let err = store.save(record("a", 1.0, 1.0), None).await.unwrap_err();
        assert!(err.is_version_conflict());
    }

    #[tokio::test]
    async fn test_index_follows_location() {
        let store = InMemoryStore::new();
        let origin = GeoPoint::new(10.0, 10.0).unwrap();
        let saved = store.save(record("a", 10.0, 10.0), None).await.unwrap();
        assert_eq!(store.within_radius(&origin, 1.0).await.unwrap().len(), 1);

        let mut moved = saved.clone();
        moved.set_location(GeoPoint::new(40.0, 40.0).unwrap());
        store.save(moved, Some(saved.version())).await.unwrap();

        assert!(store.within_radius(&origin, 1.0).await.unwrap().is_empty());
        assert_eq!(store.indexed_len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_records_not_indexed() {
        let store = InMemoryStore::new();
        let saved = store.save(record("a", 1.0, 1.0), None).await.unwrap();
        store
            .save(saved.clone().with_active(false), Some(saved.version()))
            .await
            .unwrap();

        assert_eq!(store.indexed_len(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
        let origin = GeoPoint::new(1.0, 1.0).unwrap();
        assert!(store.within_radius(&origin, 10.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_clears_index() {
        let store = InMemoryStore::new();
        store.save(record("a", 1.0, 1.0), None).await.unwrap();
        assert!(store.remove(&ProviderId::new("a")).await.unwrap());
        assert!(!store.remove(&ProviderId::new("a")).await.unwrap());
        assert_eq!(store.indexed_len(), 0);
    }

    #[tokio::test]
    async fn test_radius_across_antimeridian() {
        let store = InMemoryStore::new();
        store.save(record("east", 0.0, 179.99), None).await.unwrap();
        store.save(record("west", 0.0, -179.99), None).await.unwrap();

        let origin = GeoPoint::new(0.0, 180.0).unwrap();
        let hits = store.within_radius(&origin, 5.0).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_large_radius_walks_occupied_cells() {
        let store = InMemoryStore::with_cell_degrees(0.01);
        store.save(record("a", 0.0, 0.0), None).await.unwrap();
        store.save(record("b", 45.0, 45.0), None).await.unwrap();

        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let hits = store.within_radius(&origin, 10_000.0).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_invalid_cell_size_falls_back() {
        let store = InMemoryStore::with_cell_degrees(-1.0);
        assert_eq!(store.state.read().grid.cell_degrees, DEFAULT_CELL_DEGREES);
    }
}
