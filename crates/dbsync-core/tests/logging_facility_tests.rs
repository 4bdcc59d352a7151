#![allow(clippy::unwrap_used, clippy::expect_used)]

use dbsync_core::errors::{ExError, ExErrorKind, SyncError};
use dbsync_core::logging_facility::test_capture::init_test_capture;
use dbsync_core::{log_op_end, log_op_error, log_op_start};
use dbsync_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let start_events: Vec<_> = capture
        .events_for(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();

    assert_eq!(start_events.len(), 1);
}

#[test]
fn test_log_op_end_macro_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for(op_name);
    let end_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END))
        .expect("Should have end event");

    assert_eq!(end_event.field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err: ExError = SyncError::DuplicateKey {
        key: "(\"/a\")".to_string(),
    }
    .into();
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events_for(op_name);
    let error_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");

    assert_eq!(error_event.level, tracing::Level::ERROR);
    assert_eq!(error_event.field("err_code"), Some("ERR_DUPLICATE_KEY"));
    assert_eq!(error_event.field("err_kind"), Some("DuplicateKey"));
}

#[test]
fn test_boundary_ownership_single_start_end() {
    let capture = init_test_capture();
    let op_name = "test_boundary_ownership_unique_4";

    log_op_start!(op_name, handle = "0v1");
    log_op_end!(op_name, duration_ms = 3, change_count = 2);

    let events = capture.events_for(op_name);
    let starts = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .count();
    let ends = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .count();

    assert_eq!(starts, 1);
    assert_eq!(ends, 1);
    assert_eq!(events[0].field("handle"), Some("0v1"));
    assert_eq!(events[1].field("change_count"), Some("2"));
}

#[test]
fn test_test_capture_assert_event_exists() {
    let capture = init_test_capture();
    let op_name = "test_capture_assert_unique_5";

    log_op_start!(op_name);

    capture.assert_event_exists(op_name, EVENT_START);
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_test_capture_assert_event_exists_fails() {
    let capture = init_test_capture();

    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}

#[test]
fn test_error_event_keeps_handle_field() {
    let capture = init_test_capture();
    let op_name = "test_error_handle_unique_6";

    let err = ExError::new(ExErrorKind::InvalidHandle).with_message("stale handle");
    log_op_error!(op_name, err, duration_ms = 1, handle = "4v2");

    let events = capture.events_for(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("handle"), Some("4v2"));
    assert_eq!(events[0].field("message"), Some("stale handle"));
}
