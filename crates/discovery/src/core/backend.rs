//! Backend identification and capability discovery.

use std::fmt;

/// Identifies the type of projection store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process hash map with a grid-cell index.
    Memory,
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Capabilities that a store may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCapability {
    /// Radius queries are pre-filtered by an index instead of a full scan.
    IndexedRadiusQuery,
    /// Saves are checked against the stored version.
    OptimisticLocking,
    /// Records survive a process restart.
    Durable,
    /// Several processes may share the same store.
    SharedAccess,
}

impl fmt::Display for BackendCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendCapability::IndexedRadiusQuery => "indexed-radius-query",
            BackendCapability::OptimisticLocking => "optimistic-locking",
            BackendCapability::Durable => "durable",
            BackendCapability::SharedAccess => "shared-access",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::Sqlite.to_string(), "sqlite");
        assert_eq!(BackendKind::Custom("redis").to_string(), "redis");
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(
            BackendCapability::IndexedRadiusQuery.to_string(),
            "indexed-radius-query"
        );
    }
}
