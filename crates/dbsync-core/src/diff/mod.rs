//! Snapshot differ.
//!
//! Compares the persisted snapshot of a table with a newly observed one and
//! produces the minimal, ordered set of row-level changes plus the writes
//! that make the persisted table equal the new snapshot.
//!
//! ## Entry point
//!
//! ```ignore
//! use dbsync_core::diff::compute_changes;
//!
//! let plan = compute_changes(&schema, persisted_rows, incoming, SnapshotMode::Full, policy)?;
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: events are ordered by ascending primary key,
//!   independent of the order rows were supplied or scanned in.
//! - **Minimality**: unchanged rows produce no event and no write;
//!   modifications carry only the changed non-key columns.
//! - **Round-trip**: applying the events to the old snapshot yields the new one.

pub mod engine;
pub mod model;

pub use engine::compute_changes;
pub use model::{ChangeEvent, ChangeSet, ColumnChange, SnapshotMode, SnapshotPlan};
