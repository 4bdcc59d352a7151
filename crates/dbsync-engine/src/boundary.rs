//! JSON boundary over the process-wide registry.
//!
//! Every function here converts failures to a status code (`0` success,
//! negative per [`ExErrorKind::status_code`]) and forwards the message to
//! the handle's log sink. Nothing panics across this boundary: an
//! unexpected panic becomes `UnknownError`.
//!
//! Lifecycle events for handle operations belong to `commands`; the only
//! bracket owned here is `decode_payload`, which runs before any command.

#![allow(clippy::result_large_err)]

use crate::commands;
use crate::config::SyncOptions;
use crate::instance::LogSink;
use crate::registry::{self, Handle};
use dbsync_core::errors::{ExError, ExErrorKind, STATUS_OK};
use dbsync_core::{log_op_end, log_op_error, log_op_start};
use dbsync_core::model::{DbEngineType, HostType};
use dbsync_core_types::RequestId;
use serde_json::Value as Json;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_string())
}

/// Run `f` under a fresh request id, catching panics as `UnknownError`
fn guarded<T, F>(op: &'static str, f: F) -> Result<T, ExError>
where
    F: FnOnce() -> Result<T, ExError>,
{
    let request_id = RequestId::new();
    let span = tracing::info_span!("boundary", request_id = %request_id);
    let _entered = span.enter();

    let result = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let err = ExError::new(ExErrorKind::UnknownError)
                .with_op(op)
                .with_message(format!("internal failure: {}", panic_message(payload)));
            tracing::error!(
                component = module_path!(),
                op,
                err_kind = ?err.kind(),
                err_code = err.code(),
                message = err.message(),
            );
            Err(err)
        }
    };
    result.map_err(|e| e.with_request_id(request_id))
}

/// Parse a wire payload for `op`; a missing payload is `InvalidArgument`
fn parse_payload(op: &'static str, rows: Option<&str>) -> Result<Json, ExError> {
    const DECODE: &str = "decode_payload";
    log_op_start!(DECODE, caller = op);
    let start = Instant::now();

    let payload = match rows {
        None => Err(ExError::new(ExErrorKind::InvalidArgument).with_message("rows are required")),
        Some(text) => serde_json::from_str(text).map_err(ExError::from),
    }
    .map_err(|e| {
        let e = e.with_op(op);
        log_op_error!(
            DECODE,
            e,
            duration_ms = start.elapsed().as_millis() as u64,
            caller = op
        );
        e
    })?;

    log_op_end!(
        DECODE,
        duration_ms = start.elapsed().as_millis() as u64,
        caller = op
    );
    Ok(payload)
}

/// Send a failure to the handle's sink and turn it into a status code
fn report(handle: Option<Handle>, err: &ExError) -> i32 {
    if let Some(instance) = handle.and_then(|h| registry::global().get(h).ok()) {
        instance.log(&err.to_string());
    }
    err.status_code()
}

fn status(handle: Handle, result: Result<(), ExError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(err) => report(Some(handle), &err),
    }
}

/// Create a handle. `None` on failure, after the message has been sent to
/// `log_sink` (if given).
pub fn initialize(
    host: HostType,
    engine: DbEngineType,
    storage_path: Option<&str>,
    schema_ddl: Option<&str>,
    log_sink: Option<LogSink>,
) -> Option<Handle> {
    initialize_with_options(
        host,
        engine,
        storage_path,
        schema_ddl,
        SyncOptions::default(),
        log_sink,
    )
}

/// [`initialize`] with explicit per-handle options
pub fn initialize_with_options(
    host: HostType,
    engine: DbEngineType,
    storage_path: Option<&str>,
    schema_ddl: Option<&str>,
    options: SyncOptions,
    log_sink: Option<LogSink>,
) -> Option<Handle> {
    let sink = log_sink.clone();
    let result = guarded("initialize", || {
        registry::global().initialize(
            host,
            engine,
            storage_path.unwrap_or_default(),
            schema_ddl.unwrap_or_default(),
            options,
            log_sink,
        )
    });
    match result {
        Ok(handle) => Some(handle),
        Err(err) => {
            if let Some(sink) = sink {
                sink(&err.to_string());
            }
            None
        }
    }
}

/// Bulk load rows (JSON array or `{"table", "data"}` envelope)
pub fn insert_bulk_data(handle: Handle, rows: Option<&str>) -> i32 {
    let op = "insert_bulk_data";
    status(
        handle,
        guarded(op, || {
            let payload = parse_payload(op, rows)?;
            commands::insert_bulk_data(registry::global(), handle, &payload).map(|_| ())
        }),
    )
}

/// Diff and replace; returns the status and, on success, the change
/// array as JSON text
pub fn update_with_snapshot(handle: Handle, rows: Option<&str>) -> (i32, Option<String>) {
    let op = "update_snapshot_data";
    let result = guarded(op, || {
        let payload = parse_payload(op, rows)?;
        commands::update_snapshot_data(registry::global(), handle, &payload, None)
            .map(|changes| changes.to_json().to_string())
    });
    match result {
        Ok(changes) => (STATUS_OK, Some(changes)),
        Err(err) => (report(Some(handle), &err), None),
    }
}

/// Diff and replace, calling `sink` with one change object (JSON text) per
/// event, primary key ascending, after commit
pub fn update_with_snapshot_streaming(
    handle: Handle,
    rows: Option<&str>,
    sink: &mut dyn FnMut(&str),
) -> i32 {
    let op = "update_snapshot_data";
    status(
        handle,
        guarded(op, || {
            let payload = parse_payload(op, rows)?;
            let changes = commands::update_snapshot_data(registry::global(), handle, &payload, None)?;
            for event in changes.iter() {
                sink(&event.to_json(changes.schema()).to_string());
            }
            Ok(())
        }),
    )
}

/// Set or replace the failure sink of `handle`
pub fn attach_log_sink(handle: Handle, sink: LogSink) -> i32 {
    status(
        handle,
        guarded("attach_log_sink", || {
            registry::global().attach_log_sink(handle, sink)
        }),
    )
}

/// Close one handle
pub fn release(handle: Handle) -> i32 {
    match guarded("release", || registry::global().release(handle)) {
        Ok(()) => STATUS_OK,
        Err(err) => err.status_code(),
    }
}

/// Close every handle. Idempotent.
pub fn teardown() -> i32 {
    let result = guarded("teardown", || {
        registry::global().teardown();
        Ok(())
    });
    match result {
        Ok(()) => STATUS_OK,
        Err(err) => err.status_code(),
    }
}
