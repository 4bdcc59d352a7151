//! dbsync Core - schema, row model and snapshot differ
//!
//! This crate provides the pure (I/O free) part of the synchronization
//! engine:
//! - Canonical error facility (`ExError`, `ExErrorKind`, `SyncError`)
//! - Structured logging facility (`tracing` macros and test capture)
//! - Typed values, rows and primary keys
//! - Schema manager: DDL parsing, row validation and coercion
//! - Snapshot differ producing ordered Inserted/Modified/Deleted events

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod schema;

pub use dbsync_core_types as core_types;

// Re-export commonly used types
pub use diff::{compute_changes, ChangeEvent, ChangeSet, ColumnChange, SnapshotMode, SnapshotPlan};
pub use errors::{ExError, ExErrorKind, Result, SyncError};
pub use model::{ColumnType, DbEngineType, HostType, IncomingRow, PrimaryKey, Row, Value};
pub use schema::{parse_schema, Column, MissingColumnPolicy, TableSchema};
