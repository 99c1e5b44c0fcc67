//! Projection store implementations.
//!
//! - [`memory`] - in-process store with a grid-cell index
//! - [`sqlite`] - SQLite store (feature `sqlite`, on by default)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreConfig};
