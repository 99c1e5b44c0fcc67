//! Error types for the discovery engine.
//!
//! Errors are organised in categories (validation, record state, concurrency,
//! backend, aborted searches) wrapped by the top-level [`DiscoveryError`].
//! Callers that only need to branch on the category use [`DiscoveryError::kind`].

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::types::ProviderId;

/// The primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Malformed or out-of-range input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Record state errors (missing or duplicate projection).
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Concurrency and versioning errors.
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Storage backend errors.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The search was cancelled or timed out by the caller.
    #[error(transparent)]
    Aborted(#[from] SearchAborted),
}

/// Flat classification of a [`DiscoveryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, reported before any storage access.
    Validation,
    /// A mutation targeted an unknown provider.
    RecordNotFound,
    /// `create` targeted an already-active provider.
    DuplicateRecord,
    /// The store could not be reached.
    StorageUnavailable,
    /// A concurrent writer won every attempt at the same record.
    Conflict,
    /// The caller cancelled the search.
    Cancelled,
    /// The search exceeded its deadline.
    TimedOut,
    /// Any other backend failure.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::RecordNotFound => "record-not-found",
            ErrorKind::DuplicateRecord => "duplicate-record",
            ErrorKind::StorageUnavailable => "storage-unavailable",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::TimedOut => "timed-out",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

impl DiscoveryError {
    /// Returns the flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::Validation(_) => ErrorKind::Validation,
            DiscoveryError::Record(RecordError::NotFound { .. }) => ErrorKind::RecordNotFound,
            DiscoveryError::Record(RecordError::Duplicate { .. }) => ErrorKind::DuplicateRecord,
            DiscoveryError::Concurrency(_) => ErrorKind::Conflict,
            DiscoveryError::Backend(err) if err.is_unavailable() => ErrorKind::StorageUnavailable,
            DiscoveryError::Backend(_) => ErrorKind::Internal,
            DiscoveryError::Aborted(SearchAborted::Cancelled) => ErrorKind::Cancelled,
            DiscoveryError::Aborted(SearchAborted::TimedOut { .. }) => ErrorKind::TimedOut,
        }
    }

    /// Returns `true` for an optimistic-locking version conflict.
    pub fn is_version_conflict(&self) -> bool {
        matches!(
            self,
            DiscoveryError::Concurrency(ConcurrencyError::VersionConflict { .. })
        )
    }

    /// Returns the provider this error refers to, if any.
    pub fn provider_id(&self) -> Option<&ProviderId> {
        match self {
            DiscoveryError::Record(RecordError::NotFound { provider_id })
            | DiscoveryError::Record(RecordError::Duplicate { provider_id })
            | DiscoveryError::Concurrency(ConcurrencyError::VersionConflict {
                provider_id, ..
            })
            | DiscoveryError::Concurrency(ConcurrencyError::RetriesExhausted {
                provider_id, ..
            }) => Some(provider_id),
            _ => None,
        }
    }
}

/// Errors related to input validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A coordinate is outside its domain or not a number.
    #[error("invalid {field}: {value} (expected {min}..={max})")]
    InvalidCoordinate {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A numeric input that must be finite was NaN or infinite.
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    /// The search radius is zero, negative or not finite.
    #[error("radius must be a positive finite number of kilometers, got {radius_km}")]
    InvalidRadius { radius_km: f64 },

    /// Page numbers start at 1.
    #[error("page must be >= 1, got {page}")]
    InvalidPage { page: i64 },

    /// Page size outside 1..=max.
    #[error("page size must be in 1..={max}, got {page_size}")]
    InvalidPageSize { page_size: i64, max: u32 },

    /// A rating value outside [0, 5].
    #[error("{field} must be within [0, 5], got {value}")]
    RatingOutOfRange { field: &'static str, value: String },

    /// Review counts cannot be negative.
    #[error("review count must be non-negative, got {review_count}")]
    NegativeReviewCount { review_count: i64 },

    /// A rating was supplied for a provider with no reviews.
    #[error("average rating must be unset when review count is 0")]
    RatingWithoutReviews,

    /// A filter collection was given but empty.
    #[error("{field} filter must not be empty when present")]
    EmptyFilter { field: &'static str },

    /// Unknown subscription tier name.
    #[error("unknown subscription tier: {value}")]
    InvalidTier { value: String },

    /// An identifier was empty.
    #[error("{field} must not be empty")]
    EmptyIdentifier { field: &'static str },
}

/// Errors related to projection record state.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The provider has no projection record.
    #[error("provider record not found: {provider_id}")]
    NotFound { provider_id: ProviderId },

    /// An active projection record already exists.
    #[error("provider record already exists: {provider_id}")]
    Duplicate { provider_id: ProviderId },
}

/// Errors related to concurrent writes.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The stored version differs from the one the write was based on.
    ///
    /// A version of `0` means "no record".
    #[error("version conflict on {provider_id}: expected {expected}, found {actual}")]
    VersionConflict {
        provider_id: ProviderId,
        expected: u64,
        actual: u64,
    },

    /// Every retry of a read-modify-write hit a conflict.
    #[error("gave up updating {provider_id} after {attempts} conflicting attempts")]
    RetriesExhausted {
        provider_id: ProviderId,
        attempts: u32,
    },
}

/// Errors originating from the storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BackendError {
    /// Returns `true` when the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable { .. }
                | BackendError::ConnectionFailed { .. }
                | BackendError::PoolExhausted { .. }
        )
    }
}

/// A search that stopped before producing a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchAborted {
    /// The caller cancelled the search.
    #[error("search cancelled")]
    Cancelled,

    /// The search exceeded its deadline.
    #[error("search timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

/// Result type alias for engine operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        DiscoveryError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DiscoveryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        // A locked or unreadable database file means the store cannot be reached.
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            ) {
                return DiscoveryError::Backend(BackendError::Unavailable {
                    backend_name: "sqlite".to_string(),
                    message: err.to_string(),
                });
            }
        }

        DiscoveryError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for DiscoveryError {
    fn from(err: r2d2::Error) -> Self {
        DiscoveryError::Backend(BackendError::ConnectionFailed {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}
