//! dbsync Engine - handle registry and transaction coordinator
//!
//! Provides:
//! - `Registry`: generation-checked arena of live table handles
//! - `commands`: bulk insert and snapshot update, each one transaction
//!   under the handle's lock
//! - `emitter`: batch, closure and channel delivery of change events
//! - `boundary`: JSON-in/status-code-out facade over the global registry

pub mod boundary;
pub mod commands;
pub mod config;
pub mod emitter;
pub mod instance;
pub mod registry;

pub use commands::{
    insert_bulk_data, row_count, select_all, update_snapshot_data, update_snapshot_streaming,
};
pub use config::SyncOptions;
pub use emitter::{emit, ChangeSink};
pub use instance::{Instance, LogSink};
pub use registry::{Handle, Registry};
