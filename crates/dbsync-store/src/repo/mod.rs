//! Repository layer: one synchronized table per store
//!
//! - [`sql`] renders the per-schema statements
//! - [`hydration`] converts between typed values and SQLite values
//! - [`sqlite_repo`] owns the connection and exposes transactional access

pub mod hydration;
pub mod sql;
pub mod sqlite_repo;

pub use sqlite_repo::{StoreTxn, SyncStore};
