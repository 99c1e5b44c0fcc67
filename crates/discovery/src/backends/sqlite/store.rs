//! SQLite projection store.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{BackendCapability, BackendKind, ProjectionReader, ProjectionStore};
use crate::error::{BackendError, ConcurrencyError, DiscoveryError, DiscoveryResult};
use crate::types::{
    BoundingBox, DISTANCE_EPSILON_KM, GeoPoint, LonSpan, ProviderId, Rating,
    SearchableProviderRecord, ServiceId, SubscriptionTier,
};

use super::schema;

const BACKEND_NAME: &str = "sqlite";

const SELECT_COLUMNS: &str = "provider_id, display_name, latitude, longitude, service_ids, \
     average_rating, review_count, tier, is_active, version, updated_at";

/// Configuration for the SQLite store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Maximum number of connections in the pool. Forced to 1 in memory.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
        }
    }
}

/// Projection store backed by a single SQLite table.
///
/// Radius queries use the `(is_active, latitude, longitude)` index for a
/// bounding-box pre-filter and finish with an exact haversine check. Saves
/// run in an immediate transaction so the version check and the write are
/// atomic across connections and processes.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteStoreConfig,
    is_memory: bool,
}

impl Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Creates a new in-memory store.
    pub fn in_memory() -> DiscoveryResult<Self> {
        Self::with_config(":memory:", SqliteStoreConfig::default())
    }

    /// Opens or creates a file-based store.
    pub fn open<P: AsRef<Path>>(path: P) -> DiscoveryResult<Self> {
        Self::with_config(path, SqliteStoreConfig::default())
    }

    /// Creates a store with custom configuration and initializes the schema.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteStoreConfig) -> DiscoveryResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let enable_wal = config.enable_wal && !is_memory;
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if enable_wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            Ok(())
        });

        // Every in-memory connection is its own database.
        let max_size = if is_memory {
            1
        } else {
            config.max_connections.max(1)
        };

        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(config.min_connections.min(max_size)))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })?;

        let store = Self {
            pool,
            config,
            is_memory,
        };
        store.init_schema()?;

        tracing::info!(is_memory, max_connections = max_size, "opened sqlite projection store");
        Ok(store)
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> DiscoveryResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn)
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    fn get_connection(&self) -> DiscoveryResult<PooledConnection<SqliteConnectionManager>> {
        checkout(&self.pool)
    }

    /// Runs `work` on a pooled connection on the blocking thread pool.
    ///
    /// Waiting for a connection or for a lock never stalls the async runtime,
    /// so timeouts and cancellation around the returned future still fire.
    async fn run<T, F>(&self, work: F) -> DiscoveryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PooledConnection<SqliteConnectionManager>) -> DiscoveryResult<T>
            + Send
            + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = checkout(&pool)?;
            work(&mut conn)
        })
        .await
        .map_err(|e| {
            DiscoveryError::Backend(BackendError::Internal {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("blocking task failed: {}", e),
                source: Some(Box::new(e)),
            })
        })?
    }
}

fn checkout(
    pool: &Pool<SqliteConnectionManager>,
) -> DiscoveryResult<PooledConnection<SqliteConnectionManager>> {
    pool.get().map_err(|e| {
        DiscoveryError::Backend(BackendError::ConnectionFailed {
            backend_name: BACKEND_NAME.to_string(),
            message: e.to_string(),
        })
    })
}

/// A row as stored, before validation.
struct ProjectionRow {
    provider_id: String,
    display_name: String,
    latitude: f64,
    longitude: f64,
    service_ids: String,
    average_rating: Option<String>,
    review_count: i64,
    tier: String,
    is_active: bool,
    version: i64,
    updated_at: String,
}

impl ProjectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            provider_id: row.get(0)?,
            display_name: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            service_ids: row.get(4)?,
            average_rating: row.get(5)?,
            review_count: row.get(6)?,
            tier: row.get(7)?,
            is_active: row.get(8)?,
            version: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_record(self) -> DiscoveryResult<SearchableProviderRecord> {
        let corrupt = |what: &str, detail: String| {
            DiscoveryError::Backend(BackendError::SerializationError {
                message: format!("corrupt {} for provider {}: {}", what, self.provider_id, detail),
            })
        };

        let location = GeoPoint::new(self.latitude, self.longitude)
            .map_err(|e| corrupt("location", e.to_string()))?;
        let services: BTreeSet<ServiceId> = serde_json::from_str(&self.service_ids)?;
        let average = self
            .average_rating
            .as_deref()
            .map(str::parse::<Decimal>)
            .transpose()
            .map_err(|e| corrupt("average_rating", e.to_string()))?;
        let rating = Rating::new(average, self.review_count)
            .map_err(|e| corrupt("rating", e.to_string()))?;
        let tier: SubscriptionTier = self
            .tier
            .parse()
            .map_err(|e: crate::error::ValidationError| corrupt("tier", e.to_string()))?;
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| corrupt("updated_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(SearchableProviderRecord::from_storage(
            ProviderId::new(self.provider_id.clone()),
            self.display_name.clone(),
            location,
            services,
            rating,
            tier,
            self.is_active,
            self.version.max(0) as u64,
            updated_at,
        ))
    }
}

#[async_trait]
impl ProjectionReader for SqliteStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn capabilities(&self) -> &'static [BackendCapability] {
        if self.is_memory {
            &[
                BackendCapability::IndexedRadiusQuery,
                BackendCapability::OptimisticLocking,
            ]
        } else {
            &[
                BackendCapability::IndexedRadiusQuery,
                BackendCapability::OptimisticLocking,
                BackendCapability::Durable,
                BackendCapability::SharedAccess,
            ]
        }
    }

    async fn get(
        &self,
        provider_id: &ProviderId,
    ) -> DiscoveryResult<Option<SearchableProviderRecord>> {
        let id = provider_id.as_str().to_string();
        self.run(move |conn| {
            let sql = format!(
                "SELECT {} FROM provider_projection WHERE provider_id = ?1",
                SELECT_COLUMNS
            );
            let row = conn
                .query_row(&sql, params![id], ProjectionRow::from_row)
                .optional()?;
            row.map(ProjectionRow::into_record).transpose()
        })
        .await
    }

    async fn within_radius(
        &self,
        origin: &GeoPoint,
        radius_km: f64,
    ) -> DiscoveryResult<Vec<SearchableProviderRecord>> {
        let origin = *origin;
        self.run(move |conn| {
            let bbox = BoundingBox::around(&origin, radius_km);
            let whole = LonSpan {
                min: -180.0,
                max: 180.0,
            };
            let first = bbox.spans().first().copied().unwrap_or(whole);
            let second = bbox.spans().get(1).copied().unwrap_or(first);

            let sql = format!(
                "SELECT {} FROM provider_projection
                 WHERE is_active = 1
                   AND latitude BETWEEN ?1 AND ?2
                   AND (longitude BETWEEN ?3 AND ?4 OR longitude BETWEEN ?5 AND ?6)",
                SELECT_COLUMNS
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        bbox.min_lat,
                        bbox.max_lat,
                        first.min,
                        first.max,
                        second.min,
                        second.max
                    ],
                    ProjectionRow::from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            let candidates = rows.len();
            let mut matches = Vec::with_capacity(candidates);
            for row in rows {
                let record = match row.into_record() {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable projection row");
                        continue;
                    }
                };
                if record.location().distance_km(&origin) <= radius_km + DISTANCE_EPSILON_KM {
                    matches.push(record);
                }
            }

            tracing::trace!(radius_km, candidates, matches = matches.len(), "sqlite radius query");
            Ok(matches)
        })
        .await
    }

    async fn count(&self) -> DiscoveryResult<u64> {
        self.run(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM provider_projection", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn health_check(&self) -> DiscoveryResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
        .map_err(|e| {
            BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("health check failed: {}", e),
            }
            .into()
        })
    }
}

#[async_trait]
impl ProjectionStore for SqliteStore {
    async fn save(
        &self,
        record: SearchableProviderRecord,
        expected_version: Option<u64>,
    ) -> DiscoveryResult<SearchableProviderRecord> {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let actual: Option<i64> = tx
                .query_row(
                    "SELECT version FROM provider_projection WHERE provider_id = ?1",
                    params![record.provider_id().as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let actual = actual.map(|v| v.max(0) as u64);

            if actual != expected_version {
                return Err(ConcurrencyError::VersionConflict {
                    provider_id: record.provider_id().clone(),
                    expected: expected_version.unwrap_or(0),
                    actual: actual.unwrap_or(0),
                }
                .into());
            }

            let stored = record.stamp_version(actual.unwrap_or(0) + 1);
            let services = serde_json::to_string(stored.service_ids())?;
            let average = stored.average_rating().map(|d| d.to_string());

            tx.execute(
                "INSERT INTO provider_projection (
                    provider_id, display_name, latitude, longitude, service_ids,
                    average_rating, review_count, tier, is_active, version, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(provider_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    service_ids = excluded.service_ids,
                    average_rating = excluded.average_rating,
                    review_count = excluded.review_count,
                    tier = excluded.tier,
                    is_active = excluded.is_active,
                    version = excluded.version,
                    updated_at = excluded.updated_at",
                params![
                    stored.provider_id().as_str(),
                    stored.display_name(),
                    stored.location().latitude(),
                    stored.location().longitude(),
                    services,
                    average,
                    stored.review_count() as i64,
                    stored.tier().as_str(),
                    stored.is_active(),
                    stored.version() as i64,
                    stored.updated_at().to_rfc3339(),
                ],
            )?;
            tx.commit()?;

            Ok(stored)
        })
        .await
    }

    async fn remove(&self, provider_id: &ProviderId) -> DiscoveryResult<bool> {
        let id = provider_id.as_str().to_string();
        self.run(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM provider_projection WHERE provider_id = ?1",
                params![id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, lat: f64, lon: f64) -> SearchableProviderRecord {
        SearchableProviderRecord::new(
            ProviderId::new(id),
            format!("Provider {}", id),
            GeoPoint::new(lat, lon).unwrap(),
            SubscriptionTier::Silver,
        )
    }

    #[tokio::test]
    async fn test_round_trip_preserves_attributes() {
        let store = SqliteStore::in_memory().unwrap();
        let rating = Rating::new(Some(Decimal::new(45, 1)), 12).unwrap();
        let original = record("a", -23.5505, -46.6333)
            .with_services([ServiceId::new("plumber"), ServiceId::new("electrician")])
            .with_rating(rating);

        let saved = store.save(original.clone(), None).await.unwrap();
        let loaded = store.get(&ProviderId::new("a")).await.unwrap().unwrap();

        assert_eq!(loaded.version(), 1);
        assert!(loaded.same_attributes(&original));
        assert_eq!(loaded.updated_at().timestamp_micros(), saved.updated_at().timestamp_micros());
    }

    #[tokio::test]
    async fn test_version_conflict() {
        let store = SqliteStore::in_memory().unwrap();
        let v1 = store.save(record("a", 0.0, 0.0), None).await.unwrap();
        store.save(v1.clone(), Some(1)).await.unwrap();

        let err = store.save(v1, Some(1)).await.unwrap_err();
        assert!(err.is_version_conflict());

        let err = store.save(record("a", 0.0, 0.0), None).await.unwrap_err();
        assert!(err.is_version_conflict());
    }

    #[tokio::test]
    async fn test_radius_query_exact() {
        let store = SqliteStore::in_memory().unwrap();
        let origin = GeoPoint::new(-23.5505, -46.6333).unwrap();
        store.save(record("near", -23.5555, -46.6383), None).await.unwrap();
        store.save(record("rio", -22.9068, -43.1729), None).await.unwrap();
        store
            .save(record("off", -23.5506, -46.6334).with_active(false), None)
            .await
            .unwrap();

        let hits = store.within_radius(&origin, 10.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].provider_id().as_str(), "near");
    }

    #[tokio::test]
    async fn test_remove_and_count() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(record("a", 1.0, 1.0), None).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.remove(&ProviderId::new("a")).await.unwrap());
        assert!(!store.remove(&ProviderId::new("a")).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
        store.health_check().await.unwrap();
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: SqliteStoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.enable_wal);
    }
}
