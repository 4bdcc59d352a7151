//! Transaction coordinator.
//!
//! Every mutating operation resolves its handle, takes the per-handle
//! lock, and runs inside one storage transaction.
//!
//! ## Logging Ownership
//!
//! This layer owns lifecycle logging for handle operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, core) use only `tracing::debug!()` for internal details.

pub mod bulk_insert;
pub mod introspect;
pub mod snapshot_update;

pub use bulk_insert::insert_bulk_data;
pub use introspect::{row_count, select_all};
pub use snapshot_update::{update_snapshot_data, update_snapshot_streaming};
