//! Core storage traits.
//!
//! ```text
//! ProjectionReader   (search engine)
//!     └── ProjectionStore   (projection maintainer)
//! ```

pub mod backend;
pub mod store;

pub use backend::{BackendCapability, BackendKind};
pub use store::{ProjectionReader, ProjectionStore};
