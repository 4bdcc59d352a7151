// Every lifecycle start emitted through the boundary is closed by exactly
// one end or end_error. Own binary: the capture is process-wide.

use dbsync_core::logging_facility::test_capture::init_test_capture;
use dbsync_core::model::{DbEngineType, HostType};
use dbsync_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use dbsync_engine::boundary;
use std::collections::HashMap;

fn kinds(events: &[dbsync_core::logging_facility::test_capture::CapturedEvent]) -> Vec<&str> {
    events.iter().filter_map(|e| e.event.as_deref()).collect()
}

#[test]
fn test_boundary_brackets_are_balanced() {
    let capture = init_test_capture();
    let h = boundary::initialize(
        HostType::Agent,
        DbEngineType::InMemory,
        Some("memory"),
        Some("files(path TEXT PRIMARY KEY, size INT)"),
        None,
    )
    .unwrap();

    assert_eq!(boundary::update_with_snapshot(h, Some("[]")).0, 0);
    assert_eq!(boundary::update_with_snapshot(h, Some("[{\"path\": ")).0, -2);
    assert_eq!(boundary::insert_bulk_data(h, None), -1);

    let decode = capture.events_for("decode_payload");
    assert_eq!(
        kinds(&decode),
        vec![EVENT_START, EVENT_END, EVENT_START, EVENT_END_ERROR, EVENT_START, EVENT_END_ERROR]
    );
    assert_eq!(decode[3].field("caller"), Some("update_snapshot_data"));
    assert_eq!(decode[3].field("err_code"), Some("ERR_PARSE"));

    // a payload that never decoded never opened the command's bracket
    assert_eq!(
        kinds(&capture.events_for("update_snapshot_data")),
        vec![EVENT_START, EVENT_END]
    );
    assert!(capture.events_for("insert_bulk_data").is_empty());

    // a panicking sink surfaces as a plain error event, outside any bracket
    let status = boundary::update_with_snapshot_streaming(
        h,
        Some(r#"[{"path": "/a"}]"#),
        &mut |_: &str| panic!("sink exploded"),
    );
    assert_eq!(status, -99);
    let update = capture.events_for("update_snapshot_data");
    assert_eq!(
        kinds(&update),
        vec![EVENT_START, EVENT_END, EVENT_START, EVENT_END]
    );
    assert!(update
        .iter()
        .any(|e| e.event.is_none() && e.field("err_code") == Some("ERR_UNKNOWN")));

    assert_eq!(boundary::teardown(), 0);

    let mut open: HashMap<String, i64> = HashMap::new();
    for event in capture.events() {
        let (Some(op), Some(kind)) = (event.op.clone(), event.event.as_deref()) else {
            continue;
        };
        let depth = open.entry(op.clone()).or_default();
        match kind {
            EVENT_START => *depth += 1,
            _ => *depth -= 1,
        }
        assert!(*depth >= 0, "{} closed before it started", op);
    }
    assert!(open.values().all(|depth| *depth == 0), "unbalanced: {:?}", open);
}
