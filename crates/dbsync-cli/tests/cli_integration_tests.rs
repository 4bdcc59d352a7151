//! End-to-end runs of the `dbsync` binary against a temporary store

use serde_json::{json, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("files.sql"),
            "CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT);",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_json(&self, name: &str, value: &Json) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    fn run(&self, subcommand: &str, extra: &[&str]) -> Output {
        let db = self.path("state/store.db");
        let schema = self.path("files.sql");
        Command::new(env!("CARGO_BIN_EXE_dbsync"))
            .current_dir(self.dir.path())
            .arg(subcommand)
            .args(["--db", db.to_str().unwrap()])
            .args(["--schema", schema.to_str().unwrap()])
            .args(extra)
            .output()
            .expect("failed to execute dbsync")
    }
}

fn stdout_json(output: &Output) -> Json {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_load_sync_dump() {
    let ws = Workspace::new();
    let rows = ws.write_json("rows.json", &json!([{"path": "/a", "size": 10, "hash": "h1"}]));
    let snapshot = ws.write_json(
        "snapshot.json",
        &json!([
            {"path": "/a", "size": 20, "hash": "h1"},
            {"path": "/b", "size": 5, "hash": "h2"}
        ]),
    );

    let output = ws.run("load", &[arg(&rows)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Loaded 1 rows into files"));

    let changes = stdout_json(&ws.run("sync", &[arg(&snapshot)]));
    assert_eq!(
        changes,
        json!([
            {"type": "modified", "key": {"path": "/a"}, "changedFields": {"size": 20}},
            {"type": "inserted", "key": {"path": "/b"}, "row": {"path": "/b", "size": 5, "hash": "h2"}}
        ])
    );

    let rows = stdout_json(&ws.run("dump", &[]));
    assert_eq!(
        rows,
        json!([
            {"path": "/a", "size": 20, "hash": "h1"},
            {"path": "/b", "size": 5, "hash": "h2"}
        ])
    );
}

#[test]
fn test_partial_sync_keeps_absent_rows() {
    let ws = Workspace::new();
    let rows = ws.write_json("rows.json", &json!([{"path": "/a", "size": 1}, {"path": "/b", "size": 2}]));
    let snapshot = ws.write_json("snapshot.json", &json!([{"path": "/b", "size": 3}]));

    assert!(ws.run("load", &[arg(&rows)]).status.success());
    let changes = stdout_json(&ws.run("sync", &["--partial", arg(&snapshot)]));
    assert_eq!(
        changes,
        json!([{"type": "modified", "key": {"path": "/b"}, "changedFields": {"size": 3}}])
    );

    let rows = stdout_json(&ws.run("dump", &[]));
    assert_eq!(rows.as_array().unwrap().len(), 2);
}

#[test]
fn test_keep_missing_preserves_omitted_columns() {
    let ws = Workspace::new();
    let rows = ws.write_json("rows.json", &json!([{"path": "/a", "size": 1, "hash": "h1"}]));
    let snapshot = ws.write_json("snapshot.json", &json!([{"path": "/a", "size": 2}]));

    assert!(ws.run("load", &[arg(&rows)]).status.success());
    let changes = stdout_json(&ws.run("sync", &["--keep-missing", arg(&snapshot)]));
    assert_eq!(
        changes,
        json!([{"type": "modified", "key": {"path": "/a"}, "changedFields": {"size": 2}}])
    );
}

#[test]
fn test_failure_exits_nonzero() {
    let ws = Workspace::new();
    let bad = ws.write_json("bad.json", &json!([{"path": "/a", "owner": "root"}]));

    let output = ws.run("load", &[arg(&bad)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: [ERR_SCHEMA]"), "stderr: {}", stderr);
}
