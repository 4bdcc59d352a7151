//! Snapshot update: diff against the committed state, replace, emit.
//!
//! ## Protocol (one transaction, under the handle lock)
//!
//! 1. Validate and index the incoming rows (`DuplicateKey` on a repeated key)
//! 2. Scan the committed snapshot inside the transaction
//! 3. Merge both in key order into events plus the writes that realise them
//! 4. Apply the writes and commit
//! 5. Only after a successful commit are events handed to the caller
//!
//! A failure at any step drops the transaction, which rolls back; the
//! persisted snapshot stays as it was and no events escape.

#![allow(clippy::result_large_err)]

use crate::emitter::{emit, ChangeSink};
use crate::instance::Instance;
use crate::registry::{Handle, Registry};
use dbsync_core::diff::{compute_changes, ChangeSet, SnapshotMode};
use dbsync_core::errors::ExError;
use dbsync_core::{log_op_end, log_op_error, log_op_start};
use dbsync_store::errors::Result;
use serde_json::Value as Json;

/// Replace the table with `payload` and return the ordered changes
///
/// `mode` overrides the handle's configured `SnapshotMode` for this call.
///
/// ## Errors
///
/// - `InvalidHandle`: handle is not live
/// - `ParseError`: payload is not an array of objects
/// - `SchemaError`: a row fails validation
/// - `DuplicateKey`: two rows share a primary key
/// - `StorageError`: read, write or commit failed
pub fn update_snapshot_data(
    registry: &Registry,
    handle: Handle,
    payload: &Json,
    mode: Option<SnapshotMode>,
) -> Result<ChangeSet> {
    run_logged("update_snapshot_data", handle, || {
        let instance = registry.get(handle)?;
        apply_snapshot(&instance, payload, mode)
    })
}

/// Like [`update_snapshot_data`], but pushes each change into `sink`
/// (primary key ascending, on the calling thread) and returns the count
///
/// The handle lock is released before the first event is delivered.
pub fn update_snapshot_streaming<S>(
    registry: &Registry,
    handle: Handle,
    payload: &Json,
    mode: Option<SnapshotMode>,
    sink: &mut S,
) -> Result<usize>
where
    S: ChangeSink + ?Sized,
{
    let changes = run_logged("update_snapshot_streaming", handle, || {
        let instance = registry.get(handle)?;
        apply_snapshot(&instance, payload, mode)
    })?;
    Ok(emit(changes, sink))
}

fn run_logged<F>(op: &'static str, handle: Handle, f: F) -> Result<ChangeSet>
where
    F: FnOnce() -> Result<ChangeSet>,
{
    log_op_start!(op, handle = %handle);
    let start = std::time::Instant::now();

    let changes = f().map_err(|e| {
        let e = e.with_op(op).with_handle(handle.to_string());
        log_op_error!(
            op,
            e,
            duration_ms = start.elapsed().as_millis() as u64,
            handle = %handle
        );
        e
    })?;

    log_op_end!(
        op,
        duration_ms = start.elapsed().as_millis() as u64,
        handle = %handle,
        change_count = changes.len()
    );
    Ok(changes)
}

fn apply_snapshot(
    instance: &Instance,
    payload: &Json,
    mode: Option<SnapshotMode>,
) -> Result<ChangeSet> {
    let schema = instance.schema();
    let options = instance.options();
    let mode = mode.unwrap_or(options.snapshot_mode);
    let incoming = schema.validate_payload(payload).map_err(ExError::from)?;

    let mut store = instance.lock_store();
    let txn = store.begin()?;

    let previous = txn.scan_all()?;
    let plan = compute_changes(schema, previous, incoming, mode, options.missing_columns)
        .map_err(ExError::from)?;

    for row in &plan.upserts {
        txn.upsert(row)?;
    }
    for key in &plan.deletes {
        txn.delete(key)?;
    }
    txn.commit()?;

    tracing::debug!(
        table = schema.name(),
        upserts = plan.upserts.len(),
        deletes = plan.deletes.len(),
        "Committed snapshot"
    );

    Ok(ChangeSet::new(schema.clone(), plan.events))
}
