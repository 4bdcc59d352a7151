//! Error handling for dbsync-store
//!
//! Wraps dbsync-core ExError with store-specific helpers

use dbsync_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::StorageError)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already-applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::StorageError)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a schema mismatch error: the store already holds `table` under
/// a different declared schema
pub fn schema_mismatch(table: &str, recorded: &str, declared: &str) -> ExError {
    ExError::new(ExErrorKind::SchemaError)
        .with_op("create_table")
        .with_table(table)
        .with_message(format!(
            "Table {} was created with schema checksum {}, declared schema has {}",
            table, recorded, declared
        ))
}

/// Create a reserved-name error: `table` collides with the store's own
/// metadata or SQLite's internal tables
pub fn reserved_table(table: &str) -> ExError {
    ExError::new(ExErrorKind::SchemaError)
        .with_op("create_table")
        .with_table(table)
        .with_message(format!("Table name {} is reserved by the store", table))
}

/// Create a storage error from rusqlite::Error
///
/// The SQLite extended result code is kept as the detail code when the
/// backend reported one.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let ex = ExError::new(ExErrorKind::StorageError)
        .with_op("sqlite")
        .with_message(err.to_string());
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => ex.with_detail_code(failure.extended_code),
        _ => ex,
    }
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::StorageError)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
