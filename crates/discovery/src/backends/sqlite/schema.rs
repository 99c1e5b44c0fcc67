//! SQLite schema definitions and migrations.

use rusqlite::Connection;

use crate::error::{BackendError, DiscoveryResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> DiscoveryResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(BackendError::MigrationError {
            message: format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            ),
        }
        .into());
    }

    Ok(())
}

/// Get the current schema version.
pub(crate) fn get_schema_version(conn: &Connection) -> DiscoveryResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create schema_version table", e))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> DiscoveryResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error("Failed to set schema_version", e))?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> DiscoveryResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS provider_projection (
            provider_id TEXT NOT NULL PRIMARY KEY,
            display_name TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            service_ids TEXT NOT NULL,
            average_rating TEXT,
            review_count INTEGER NOT NULL DEFAULT 0,
            tier TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error("Failed to create provider_projection table", e))?;

    // Bounding-box pre-filter for radius queries.
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_projection_geo
            ON provider_projection (is_active, latitude, longitude)",
        [],
    )
    .map_err(|e| migration_error("Failed to create idx_projection_geo", e))?;

    Ok(())
}

fn migration_error(context: &str, e: rusqlite::Error) -> crate::error::DiscoveryError {
    BackendError::MigrationError {
        message: format!("{}: {}", context, e),
    }
    .into()
}
