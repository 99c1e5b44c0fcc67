//! Locus Provider Discovery
//!
//! Geospatial discovery and ranking of service providers. Given a searcher's
//! location and optional filters, the engine returns a deterministically
//! ordered, paginated list of providers within a radius.
//!
//! # Features
//!
//! - **Radius search**: exact haversine inclusion (inclusive bound) with an
//!   index or bounding-box pre-filter
//! - **Composable filters**: any-of services, minimum rating, tier subset
//! - **Total ranking order**: tier, rating (unrated last), distance, provider id
//! - **Projection maintenance**: idempotent, version-checked mutations driven
//!   by upstream events
//! - **Cancellation**: caller-driven cancellation and timeouts at the storage call
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite store with in-memory and file modes
//!
//! The in-memory store is always available.
//!
//! # Architecture
//!
//! - [`types`] - Geo points, identifiers, tiers, ratings, records, criteria, results
//! - [`error`] - Error types for all operations
//! - [`core`] - Storage traits split into read and write halves
//! - [`backends`] - Store implementations (memory, SQLite)
//! - [`maintainer`] - The only writer of the projection
//! - [`ranking`] - Filter stages and the ranking comparator
//! - [`engine`] - The read-only search entry point
//! - [`config`] - Engine and store configuration
//! - [`logging`] - Tracing subscriber setup
//!
//! # Quick Start
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
//! let engine = SearchEngine::new(store);
//!
//! let center = GeoPoint::new(-23.5505, -46.6333)?;
//! let plat = ProviderId::new("platinum");
//! let free = ProviderId::new("free");
//! maintainer
//!     .create(&plat, "Far but Platinum", center.destination(0.0, 5.0)?, SubscriptionTier::Platinum)
//!     .await?;
//! maintainer
//!     .create(&free, "Near but Free", center.destination(0.0, 0.5)?, SubscriptionTier::Free)
//!     .await?;
//!
//! let criteria = SearchCriteria::builder(center, 50.0).build()?;
//! let result = engine.search(&criteria).await?;
//! let order: Vec<_> = result.records().map(|r| r.provider_id().clone()).collect();
//! assert_eq!(order, vec![plat, free]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod logging;
pub mod maintainer;
pub mod ranking;
pub mod types;

pub use config::DiscoveryConfig;
pub use engine::SearchEngine;
pub use error::{DiscoveryError, DiscoveryResult, ErrorKind};
pub use maintainer::{ProjectionEvent, ProjectionMaintainer};
