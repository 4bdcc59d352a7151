//! Three-way merge of persisted and incoming rows, walked in key order.

use crate::diff::model::{ChangeEvent, ColumnChange, SnapshotMode, SnapshotPlan};
use crate::errors::{Result, SyncError};
use crate::model::{IncomingRow, PrimaryKey, Row, Value};
use crate::schema::{MissingColumnPolicy, TableSchema};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Index incoming rows by primary key.
///
/// # Errors
///
/// `DuplicateKey` if two rows share a key.
fn index_incoming(
    schema: &TableSchema,
    incoming: Vec<IncomingRow>,
) -> Result<BTreeMap<PrimaryKey, IncomingRow>> {
    let mut indexed = BTreeMap::new();
    for row in incoming {
        match indexed.entry(schema.key_of_incoming(&row)) {
            Entry::Occupied(existing) => {
                return Err(SyncError::DuplicateKey {
                    key: existing.key().to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }
    Ok(indexed)
}

/// Non-key columns whose value differs, with their new values
fn changed_columns(schema: &TableSchema, old: &Row, new: &Row) -> Vec<ColumnChange> {
    schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| !schema.is_key_column(*i))
        .filter(|(i, _)| old.get(*i) != new.get(*i))
        .map(|(i, column)| ColumnChange {
            column: column.name.clone(),
            value: new.get(i).cloned().unwrap_or(Value::Null),
        })
        .collect()
}

/// Compute the changes between the persisted snapshot and an incoming one
///
/// `previous` may arrive in any order. In `SnapshotMode::Partial` keys
/// absent from `incoming` are neither deleted nor reported.
///
/// # Errors
///
/// - `DuplicateKey` — two incoming rows share a primary key
/// - `NullViolation` — a NOT NULL column resolves to null after applying
///   the missing-column policy
pub fn compute_changes<I>(
    schema: &TableSchema,
    previous: I,
    incoming: Vec<IncomingRow>,
    mode: SnapshotMode,
    policy: MissingColumnPolicy,
) -> Result<SnapshotPlan>
where
    I: IntoIterator<Item = Row>,
{
    let incoming = index_incoming(schema, incoming)?;
    let previous: BTreeMap<PrimaryKey, Row> = previous
        .into_iter()
        .map(|row| (schema.key_of(&row), row))
        .collect();

    let mut plan = SnapshotPlan::default();
    let mut old_iter = previous.into_iter().peekable();
    let mut new_iter = incoming.into_iter().peekable();

    loop {
        let step = match (old_iter.peek(), new_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((old_key, _)), Some((new_key, _))) => old_key.cmp(new_key),
        };

        match step {
            // only in the persisted snapshot
            Ordering::Less => {
                if let Some((key, _)) = old_iter.next() {
                    if mode == SnapshotMode::Full {
                        plan.deletes.push(key.clone());
                        plan.events.push(ChangeEvent::Deleted { key });
                    }
                }
            }
            // only in the incoming snapshot
            Ordering::Greater => {
                if let Some((key, row)) = new_iter.next() {
                    let row = schema.complete_row(row, policy, None)?;
                    plan.upserts.push(row.clone());
                    plan.events.push(ChangeEvent::Inserted { key, row });
                }
            }
            Ordering::Equal => {
                if let (Some((key, old)), Some((_, new))) = (old_iter.next(), new_iter.next()) {
                    let new = schema.complete_row(new, policy, Some(&old))?;
                    let changed = changed_columns(schema, &old, &new);
                    if !changed.is_empty() {
                        plan.upserts.push(new);
                        plan.events.push(ChangeEvent::Modified { key, changed });
                    }
                }
            }
        }
    }

    tracing::debug!(
        table = schema.name(),
        events = plan.events.len(),
        upserts = plan.upserts.len(),
        deletes = plan.deletes.len(),
        "Computed snapshot changes"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;
    use serde_json::{json, Value as Json};

    fn files() -> TableSchema {
        parse_schema("files(path TEXT PRIMARY KEY, size INT, hash TEXT)").unwrap()
    }

    fn incoming(schema: &TableSchema, rows: Json) -> Vec<IncomingRow> {
        schema.validate_payload(&rows).unwrap()
    }

    fn persisted(schema: &TableSchema, rows: Json) -> Vec<Row> {
        incoming(schema, rows)
            .into_iter()
            .map(|r| schema.complete_row(r, MissingColumnPolicy::Null, None).unwrap())
            .collect()
    }

    fn key(path: &str) -> PrimaryKey {
        PrimaryKey::new(vec![Value::from(path)])
    }

    #[test]
    fn test_modified_carries_only_changed_columns() {
        let s = files();
        let old = persisted(&s, json!([{"path": "/a", "size": 10, "hash": "h1"}]));
        let new = incoming(
            &s,
            json!([
                {"path": "/b", "size": 5, "hash": "h2"},
                {"path": "/a", "size": 20, "hash": "h1"}
            ]),
        );
        let plan = compute_changes(&s, old, new, SnapshotMode::Full, MissingColumnPolicy::Null)
            .unwrap();

        assert_eq!(plan.events.len(), 2);
        assert_eq!(
            plan.events[0],
            ChangeEvent::Modified {
                key: key("/a"),
                changed: vec![ColumnChange {
                    column: "size".to_string(),
                    value: Value::from(20)
                }]
            }
        );
        assert!(matches!(&plan.events[1], ChangeEvent::Inserted { key: k, .. } if *k == key("/b")));
        assert_eq!(plan.upserts.len(), 2);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_empty_snapshot_deletes_everything() {
        let s = files();
        let old = persisted(
            &s,
            json!([{"path": "/b", "size": 1}, {"path": "/a", "size": 2}]),
        );
        let plan = compute_changes(&s, old, vec![], SnapshotMode::Full, MissingColumnPolicy::Null)
            .unwrap();
        assert_eq!(
            plan.events,
            vec![
                ChangeEvent::Deleted { key: key("/a") },
                ChangeEvent::Deleted { key: key("/b") }
            ]
        );
        assert_eq!(plan.deletes, vec![key("/a"), key("/b")]);
    }

    #[test]
    fn test_identical_snapshot_is_noop() {
        let s = files();
        let rows = json!([{"path": "/a", "size": 10, "hash": "h1"}]);
        let plan = compute_changes(
            &s,
            persisted(&s, rows.clone()),
            incoming(&s, rows),
            SnapshotMode::Full,
            MissingColumnPolicy::Null,
        )
        .unwrap();
        assert!(plan.events.is_empty());
        assert!(plan.upserts.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_duplicate_incoming_key() {
        let s = files();
        let new = incoming(&s, json!([{"path": "/a"}, {"path": "/a", "size": 3}]));
        let err = compute_changes(&s, vec![], new, SnapshotMode::Full, MissingColumnPolicy::Null)
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateKey { .. }));
    }

    #[test]
    fn test_partial_mode_never_deletes() {
        let s = files();
        let old = persisted(&s, json!([{"path": "/a", "size": 1}, {"path": "/b", "size": 2}]));
        let new = incoming(&s, json!([{"path": "/b", "size": 3}]));
        let plan =
            compute_changes(&s, old, new, SnapshotMode::Partial, MissingColumnPolicy::Null)
                .unwrap();
        assert_eq!(plan.events.len(), 1);
        assert!(matches!(plan.events[0], ChangeEvent::Modified { .. }));
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_keep_previous_ignores_omitted_columns() {
        let s = files();
        let old = persisted(&s, json!([{"path": "/a", "size": 1, "hash": "h1"}]));
        let new = incoming(&s, json!([{"path": "/a", "hash": "h1"}]));

        let plan = compute_changes(
            &s,
            old.clone(),
            new.clone(),
            SnapshotMode::Full,
            MissingColumnPolicy::KeepPrevious,
        )
        .unwrap();
        assert!(plan.events.is_empty());

        // under the null policy the omitted size becomes null
        let plan =
            compute_changes(&s, old, new, SnapshotMode::Full, MissingColumnPolicy::Null).unwrap();
        assert_eq!(
            plan.events,
            vec![ChangeEvent::Modified {
                key: key("/a"),
                changed: vec![ColumnChange {
                    column: "size".to_string(),
                    value: Value::Null
                }]
            }]
        );
    }
}
