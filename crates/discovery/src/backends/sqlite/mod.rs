//! SQLite projection store.
//!
//! Supports both in-memory databases (tests, single-process deployments) and
//! file-based databases shared between processes.
//!
//! # Example
//!
//! ```no_run
//! use locus_discovery::backends::sqlite::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("projection.db")?;
//! assert!(!store.is_memory());
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE provider_projection (
//!     provider_id TEXT NOT NULL PRIMARY KEY,
//!     display_name TEXT NOT NULL,
//!     latitude REAL NOT NULL,
//!     longitude REAL NOT NULL,
//!     service_ids TEXT NOT NULL,      -- JSON array
//!     average_rating TEXT,            -- decimal string, NULL when unrated
//!     review_count INTEGER NOT NULL DEFAULT 0,
//!     tier TEXT NOT NULL,
//!     is_active INTEGER NOT NULL DEFAULT 1,
//!     version INTEGER NOT NULL,
//!     updated_at TEXT NOT NULL        -- RFC 3339
//! );
//!
//! CREATE INDEX idx_projection_geo
//!     ON provider_projection (is_active, latitude, longitude);
//! ```

mod schema;
mod store;

pub use schema::SCHEMA_VERSION;
pub use store::{SqliteStore, SqliteStoreConfig};
