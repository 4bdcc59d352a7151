//! Schema manager.
//!
//! A `TableSchema` is parsed once per handle from DDL-like text (see
//! [`parser`]) and then validates every incoming row (see [`validate`]).
//!
//! ## Invariants
//!
//! - Column names are unique and valid identifiers.
//! - The primary key is non-empty, references declared columns only, and
//!   its columns are NOT NULL.

pub mod parser;
pub mod validate;

pub use parser::parse_schema;
pub use validate::{coerce_value, MissingColumnPolicy};

use crate::model::{ColumnType, PrimaryKey, Row, Value};
use serde_json::Map;

/// One declared column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Declared DEFAULT, already coerced to the column type
    pub default: Option<Value>,
}

/// Declared layout of one synchronized table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<usize>,
}

impl TableSchema {
    /// Build a schema from already-checked parts.
    ///
    /// Used by the parser after it has enforced the invariants above.
    pub(crate) fn from_parts(name: String, columns: Vec<Column>, primary_key: Vec<usize>) -> Self {
        Self {
            name,
            columns,
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column positions that form the primary key, in key order
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.primary_key.iter().map(move |&i| &self.columns[i])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_key_column(&self, index: usize) -> bool {
        self.primary_key.contains(&index)
    }

    /// Extract the primary key of a complete row
    pub fn key_of(&self, row: &Row) -> PrimaryKey {
        PrimaryKey::new(
            self.primary_key
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Render a key as a `{column: value}` object
    pub fn key_to_json(&self, key: &PrimaryKey) -> serde_json::Value {
        let map: Map<String, serde_json::Value> = self
            .primary_key_columns()
            .zip(key.values())
            .map(|(c, v)| (c.name.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Render a row as a `{column: value}` object
    pub fn row_to_json(&self, row: &Row) -> serde_json::Value {
        let map: Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(row.values())
            .map(|(c, v)| (c.name.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Normalised textual form, stable across whitespace and case changes
    /// in the source DDL. Used to detect a schema change on re-open.
    pub fn canonical_form(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", c.name, c.column_type);
                if !c.nullable {
                    def.push_str(" NOT NULL");
                }
                if let Some(default) = &c.default {
                    def.push_str(&format!(" DEFAULT {}", default));
                }
                def
            })
            .collect();
        let key: Vec<&str> = self
            .primary_key_columns()
            .map(|c| c.name.as_str())
            .collect();
        format!(
            "{}({}, PRIMARY KEY({}))",
            self.name,
            columns.join(", "),
            key.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files_schema() -> TableSchema {
        parse_schema("files(path TEXT PRIMARY KEY, size INT, hash TEXT)").unwrap()
    }

    #[test]
    fn test_key_of_row() {
        let schema = files_schema();
        let row = Row::new(vec![Value::from("/a"), Value::from(10), Value::from("h1")]);
        assert_eq!(
            schema.key_of(&row),
            PrimaryKey::new(vec![Value::from("/a")])
        );
    }

    #[test]
    fn test_row_to_json_uses_column_names() {
        let schema = files_schema();
        let row = Row::new(vec![Value::from("/a"), Value::from(10), Value::Null]);
        assert_eq!(
            schema.row_to_json(&row),
            serde_json::json!({"path": "/a", "size": 10, "hash": null})
        );
    }

    #[test]
    fn test_canonical_form_ignores_formatting() {
        let a = parse_schema("files(path TEXT PRIMARY KEY, size INT, hash TEXT)").unwrap();
        let b = parse_schema(
            "CREATE TABLE files (\n  path text NOT NULL,\n  size integer,\n  hash text,\n  PRIMARY KEY (path)\n);",
        )
        .unwrap();
        assert_eq!(a.canonical_form(), b.canonical_form());
    }
}
