use dbsync_core::{parse_schema, IncomingRow, MissingColumnPolicy, Row, TableSchema};
use serde_json::Value as Json;

/// `files(path TEXT PRIMARY KEY, size INTEGER, hash TEXT)`
#[allow(dead_code)]
pub fn files_schema() -> TableSchema {
    parse_schema("CREATE TABLE files (path TEXT PRIMARY KEY, size INTEGER, hash TEXT)").unwrap()
}

/// Validate a JSON row array against `schema`
#[allow(dead_code)]
pub fn incoming(schema: &TableSchema, rows: Json) -> Vec<IncomingRow> {
    schema.validate_payload(&rows).unwrap()
}

/// Validate and complete a JSON row array, as if it had been persisted
#[allow(dead_code)]
pub fn persisted(schema: &TableSchema, rows: Json) -> Vec<Row> {
    incoming(schema, rows)
        .into_iter()
        .map(|r| {
            schema
                .complete_row(r, MissingColumnPolicy::Null, None)
                .unwrap()
        })
        .collect()
}
