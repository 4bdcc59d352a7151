//! Read-only views of the committed snapshot.
//!
//! These take the same per-handle lock as mutations, so they never
//! observe a half-applied call.

#![allow(clippy::result_large_err)]

use crate::registry::{Handle, Registry};
use dbsync_core::model::Row;
use dbsync_store::errors::Result;

/// Committed rows, primary key ascending
pub fn select_all(registry: &Registry, handle: Handle) -> Result<Vec<Row>> {
    let instance = registry
        .get(handle)
        .map_err(|e| e.with_op("select_all"))?;
    let store = instance.lock_store();
    store.scan_all()
}

pub fn row_count(registry: &Registry, handle: Handle) -> Result<usize> {
    let instance = registry.get(handle).map_err(|e| e.with_op("row_count"))?;
    let store = instance.lock_store();
    store.row_count()
}
