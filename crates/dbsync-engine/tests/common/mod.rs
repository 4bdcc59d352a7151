use dbsync_core::model::{DbEngineType, HostType};
use dbsync_engine::{Handle, Registry, SyncOptions};
use serde_json::{json, Value as Json};

pub const FILES_DDL: &str = "files(path TEXT PRIMARY KEY, size INT, hash TEXT)";

/// Handle on a private in-memory store
#[allow(dead_code)]
pub fn in_memory(registry: &Registry, ddl: &str, options: SyncOptions) -> Handle {
    registry
        .initialize(
            HostType::Agent,
            DbEngineType::InMemory,
            "memory",
            ddl,
            options,
            None,
        )
        .unwrap()
}

/// Persisted snapshot rendered as JSON rows
#[allow(dead_code)]
pub fn persisted(registry: &Registry, handle: Handle) -> Json {
    let instance = registry.get(handle).unwrap();
    let schema = instance.schema().clone();
    Json::Array(
        dbsync_engine::select_all(registry, handle)
            .unwrap()
            .iter()
            .map(|row| schema.row_to_json(row))
            .collect(),
    )
}

#[allow(dead_code)]
pub fn s1() -> Json {
    json!([{"path": "/a", "size": 10, "hash": "h1"}])
}

#[allow(dead_code)]
pub fn s2() -> Json {
    json!([
        {"path": "/a", "size": 20, "hash": "h1"},
        {"path": "/b", "size": 5, "hash": "h2"}
    ])
}
