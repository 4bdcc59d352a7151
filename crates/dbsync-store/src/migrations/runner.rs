//! Migration runner
//!
//! Applies migrations in order, once each, recording a checksum per
//! migration. A recorded checksum that no longer matches the embedded SQL
//! is an error.

#![allow(clippy::result_large_err)]

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::get_migrations;
use rusqlite::{Connection, OptionalExtension};

/// Bookkeeping table for applied migrations
pub const SCHEMA_VERSION_TABLE: &str = "dbsync_schema_version";

/// Registry of synchronized tables and their schema checksums (migration 001)
pub const SYNC_TABLES_TABLE: &str = "dbsync_tables";

/// Apply all pending migrations to the database
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    create_schema_version_table(conn)?;

    for migration in get_migrations() {
        apply_migration(conn, migration.id, migration.sql)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY,
                migration_id TEXT NOT NULL UNIQUE,
                applied_at INTEGER NOT NULL,
                checksum TEXT NOT NULL
            )",
            SCHEMA_VERSION_TABLE
        ),
        [],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

/// Apply a single migration if not already applied
fn apply_migration(conn: &mut Connection, migration_id: &str, sql: &str) -> Result<()> {
    let checksum = compute_checksum(sql);

    let recorded: Option<String> = conn
        .query_row(
            &format!(
                "SELECT checksum FROM {} WHERE migration_id = ?1",
                SCHEMA_VERSION_TABLE
            ),
            [migration_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    if let Some(recorded) = recorded {
        if recorded != checksum {
            return Err(checksum_mismatch(migration_id, &recorded, &checksum));
        }
        return Ok(());
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;

    tx.execute_batch(sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        &format!(
            "INSERT INTO {} (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
            SCHEMA_VERSION_TABLE
        ),
        rusqlite::params![migration_id, now, checksum],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(migration_id, "Applied migration");
    Ok(())
}
