// Global teardown releases every handle. Alone in its binary because it
// invalidates handles held by any other test.

use dbsync_core::model::{DbEngineType, HostType};
use dbsync_engine::boundary;

#[test]
fn test_teardown_releases_everything_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("procs.db");
    let path = path.to_str().unwrap();

    let handles: Vec<_> = ["procs(pid INT PRIMARY KEY, name TEXT)", "ports(port INT PRIMARY KEY)"]
        .iter()
        .map(|ddl| {
            boundary::initialize(HostType::Manager, DbEngineType::Sqlite3, Some(path), Some(ddl), None)
                .unwrap()
        })
        .collect();

    assert_eq!(
        boundary::insert_bulk_data(handles[0], Some(r#"[{"pid": 1, "name": "init"}]"#)),
        0
    );

    assert_eq!(boundary::teardown(), 0);
    assert_eq!(boundary::teardown(), 0);

    for h in &handles {
        assert_eq!(boundary::insert_bulk_data(*h, Some("[]")), -5);
    }

    // storage outlives the handles
    let h = boundary::initialize(
        HostType::Manager,
        DbEngineType::Sqlite3,
        Some(path),
        Some("procs(pid INT PRIMARY KEY, name TEXT)"),
        None,
    )
    .unwrap();
    let (status, changes) = boundary::update_with_snapshot(h, Some("[]"));
    assert_eq!(status, 0);
    assert_eq!(
        changes.as_deref(),
        Some(r#"[{"key":{"pid":1},"type":"deleted"}]"#)
    );
    assert_eq!(boundary::teardown(), 0);
}
