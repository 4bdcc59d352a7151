//! dbsync Store - storage engine adapter over SQLite
//!
//! Provides:
//! - Connection open/configure per host and engine type
//! - Checksummed migrations for the store's metadata tables
//! - Per-schema table creation guarded by a recorded schema checksum
//! - Transactional upsert, lookup, delete and ordered scan

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use db::ConnectionOptions;
pub use errors::Result;
pub use repo::{StoreTxn, SyncStore};
