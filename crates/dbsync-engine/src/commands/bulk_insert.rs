//! Bulk load without diffing.

#![allow(clippy::result_large_err)]

use crate::instance::Instance;
use crate::registry::{Handle, Registry};
use dbsync_core::errors::ExError;
use dbsync_core::schema::MissingColumnPolicy;
use dbsync_core::{log_op_end, log_op_error, log_op_start};
use dbsync_store::errors::Result;
use serde_json::Value as Json;

const OP: &str = "insert_bulk_data";

/// Upsert every row of `payload` in one transaction
///
/// Reads no prior state (except for omitted columns under
/// `MissingColumnPolicy::KeepPrevious`) and produces no change events.
/// Returns the number of rows written.
///
/// ## Errors
///
/// - `InvalidHandle`: handle is not live
/// - `ParseError`: payload is not an array of objects
/// - `SchemaError`: a row fails validation; nothing is written
/// - `StorageError`: the transaction could not begin or commit; nothing is written
pub fn insert_bulk_data(registry: &Registry, handle: Handle, payload: &Json) -> Result<usize> {
    log_op_start!(OP, handle = %handle);
    let start = std::time::Instant::now();

    let result = registry
        .get(handle)
        .and_then(|instance| insert_bulk_data_impl(&instance, payload))
        .map_err(|e| {
            let e = e.with_op(OP).with_handle(handle.to_string());
            log_op_error!(
                OP,
                e,
                duration_ms = start.elapsed().as_millis() as u64,
                handle = %handle
            );
            e
        })?;

    log_op_end!(
        OP,
        duration_ms = start.elapsed().as_millis() as u64,
        handle = %handle,
        row_count = result
    );
    Ok(result)
}

fn insert_bulk_data_impl(instance: &Instance, payload: &Json) -> Result<usize> {
    let schema = instance.schema();
    let policy = instance.options().missing_columns;
    let rows = schema.validate_payload(payload).map_err(ExError::from)?;

    let count = rows.len();

    let mut store = instance.lock_store();
    let txn = store.begin()?;
    for incoming in rows {
        let previous = match policy {
            MissingColumnPolicy::KeepPrevious => txn.get(&schema.key_of_incoming(&incoming))?,
            MissingColumnPolicy::Null => None,
        };
        let row = schema
            .complete_row(incoming, policy, previous.as_ref())
            .map_err(ExError::from)?;
        txn.upsert(&row)?;
    }
    txn.commit()?;

    Ok(count)
}
