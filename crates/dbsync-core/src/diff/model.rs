//! Change events and diff results.
//!
//! Events are always held in ascending primary-key order.

use crate::model::{PrimaryKey, Row, Value};
use crate::schema::TableSchema;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a submitted snapshot relates to the persisted table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// The snapshot is the complete table: absent keys are deleted
    #[default]
    Full,
    /// The snapshot is an upsert set: absent keys are left alone
    Partial,
}

/// New value of one changed column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChange {
    pub column: String,
    pub value: Value,
}

/// One row-level change between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Inserted { key: PrimaryKey, row: Row },
    /// Only the non-key columns whose value changed
    Modified {
        key: PrimaryKey,
        changed: Vec<ColumnChange>,
    },
    Deleted { key: PrimaryKey },
}

impl ChangeEvent {
    pub fn key(&self) -> &PrimaryKey {
        match self {
            ChangeEvent::Inserted { key, .. }
            | ChangeEvent::Modified { key, .. }
            | ChangeEvent::Deleted { key } => key,
        }
    }

    /// Wire tag: `inserted`, `modified` or `deleted`
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted { .. } => "inserted",
            ChangeEvent::Modified { .. } => "modified",
            ChangeEvent::Deleted { .. } => "deleted",
        }
    }

    /// Render as `{type, key, row | changedFields}`
    pub fn to_json(&self, schema: &TableSchema) -> serde_json::Value {
        let key = schema.key_to_json(self.key());
        match self {
            ChangeEvent::Inserted { row, .. } => json!({
                "type": self.kind(),
                "key": key,
                "row": schema.row_to_json(row),
            }),
            ChangeEvent::Modified { changed, .. } => {
                let fields: Map<String, serde_json::Value> = changed
                    .iter()
                    .map(|c| (c.column.clone(), c.value.to_json()))
                    .collect();
                json!({
                    "type": self.kind(),
                    "key": key,
                    "changedFields": fields,
                })
            }
            ChangeEvent::Deleted { .. } => json!({
                "type": self.kind(),
                "key": key,
            }),
        }
    }
}

/// Ordered result of one snapshot update
#[derive(Debug, Clone)]
pub struct ChangeSet {
    schema: Arc<TableSchema>,
    events: Vec<ChangeEvent>,
}

impl ChangeSet {
    pub fn new(schema: Arc<TableSchema>, events: Vec<ChangeEvent>) -> Self {
        Self { schema, events }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent> {
        self.events.iter()
    }

    /// Wire form: a JSON array of change objects
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.events.iter().map(|e| e.to_json(&self.schema)).collect())
    }

    /// Apply these changes to an in-memory copy of the prior snapshot
    pub fn apply_to(&self, snapshot: &mut BTreeMap<PrimaryKey, Row>) {
        for event in &self.events {
            match event {
                ChangeEvent::Inserted { key, row } => {
                    snapshot.insert(key.clone(), row.clone());
                }
                ChangeEvent::Modified { key, changed } => {
                    if let Some(row) = snapshot.get_mut(key) {
                        for change in changed {
                            if let Some(index) = self.schema.column_index(&change.column) {
                                row.set(index, change.value.clone());
                            }
                        }
                    }
                }
                ChangeEvent::Deleted { key } => {
                    snapshot.remove(key);
                }
            }
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeEvent;
    type IntoIter = std::vec::IntoIter<ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeEvent;
    type IntoIter = std::slice::Iter<'a, ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Writes needed to make the persisted table equal the new snapshot,
/// together with the events describing them.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPlan {
    pub events: Vec<ChangeEvent>,
    /// Rows to insert or replace, in key order
    pub upserts: Vec<Row>,
    /// Keys to remove, in key order
    pub deletes: Vec<PrimaryKey>,
}
