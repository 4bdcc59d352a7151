//! Migration framework for the store's own metadata tables
//!
//! Provides:
//! - Migration runner with checksums
//! - Idempotent application
//! - Embedded SQL migrations
//!
//! Synchronized tables themselves are never migrated; see
//! [`crate::repo::SyncStore::create_table_if_absent`].

pub(crate) mod checksums;
mod embedded;
mod runner;

pub use checksums::compute_checksum;
pub use runner::{apply_migrations, SCHEMA_VERSION_TABLE, SYNC_TABLES_TABLE};
