//! Row validation and coercion.
//!
//! ## Coercion rules
//!
//! | Column  | Accepted JSON                                  | Result        |
//! |---------|------------------------------------------------|---------------|
//! | integer | integer number                                 | as-is         |
//! | integer | float with zero fraction inside the i64 range  | integer       |
//! | integer | string parsing as i64 (trimmed)                | integer       |
//! | real    | any number                                     | f64           |
//! | real    | string parsing as a finite f64 (trimmed)       | f64           |
//! | text    | string                                         | as-is         |
//! | text    | number                                         | decimal text  |
//! | boolean | bool                                           | as-is         |
//! | boolean | integer 0 / 1                                  | false / true  |
//! | boolean | `"true"` / `"false"` (any case)                | bool          |
//! | any     | null                                           | null          |
//!
//! Anything else is a `TypeMismatch`. Null handling (key columns,
//! NOT NULL columns) happens after coercion.

use crate::errors::{Result, SyncError};
use crate::model::{ColumnType, IncomingRow, Row, Value};
use crate::schema::TableSchema;
use serde_json::{Map, Value as Json};

/// What a payload row means when it omits a non-key column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingColumnPolicy {
    /// The column takes its declared DEFAULT, or null
    #[default]
    Null,
    /// The column keeps the value already persisted for that key
    /// (DEFAULT or null for keys seen for the first time)
    KeepPrevious,
}

fn describe(json: &Json) -> String {
    match json {
        Json::Null => "null".to_string(),
        Json::Bool(b) => format!("bool {}", b),
        Json::Number(n) => format!("number {}", n),
        Json::String(s) => format!("string {:?}", s),
        Json::Array(_) => "array".to_string(),
        Json::Object(_) => "object".to_string(),
    }
}

/// Coerce one JSON value to a column type
///
/// # Errors
///
/// `TypeMismatch` when no rule in the table above applies.
pub fn coerce_value(column: &str, column_type: ColumnType, json: &Json) -> Result<Value> {
    let mismatch = || SyncError::TypeMismatch {
        column: column.to_string(),
        expected: column_type,
        found: describe(json),
    };

    let value = match (column_type, json) {
        (_, Json::Null) => Value::Null,

        (ColumnType::Integer, Json::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                let f = n.as_f64().ok_or_else(mismatch)?;
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Value::Integer(f as i64)
                } else {
                    return Err(mismatch());
                }
            }
        }
        (ColumnType::Integer, Json::String(s)) => {
            Value::Integer(s.trim().parse::<i64>().map_err(|_| mismatch())?)
        }

        (ColumnType::Real, Json::Number(n)) => Value::real(n.as_f64().ok_or_else(mismatch)?),
        (ColumnType::Real, Json::String(s)) => {
            let f = s.trim().parse::<f64>().map_err(|_| mismatch())?;
            if !f.is_finite() {
                return Err(mismatch());
            }
            Value::real(f)
        }

        (ColumnType::Text, Json::String(s)) => Value::Text(s.clone()),
        (ColumnType::Text, Json::Number(n)) => Value::Text(n.to_string()),

        (ColumnType::Boolean, Json::Bool(b)) => Value::Boolean(*b),
        (ColumnType::Boolean, Json::Number(n)) => match n.as_i64() {
            Some(0) => Value::Boolean(false),
            Some(1) => Value::Boolean(true),
            _ => return Err(mismatch()),
        },
        (ColumnType::Boolean, Json::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => return Err(mismatch()),
        },

        _ => return Err(mismatch()),
    };
    Ok(value)
}

impl TableSchema {
    /// Validate one JSON object against the schema
    ///
    /// # Errors
    ///
    /// - `UnknownColumn` — the object names a column not in the schema
    /// - `MissingKey` — a key column is absent or null
    /// - `TypeMismatch` — a value cannot be coerced
    /// - `NullViolation` — explicit null for a NOT NULL column
    pub fn validate_row(&self, object: &Map<String, Json>) -> Result<IncomingRow> {
        if let Some(unknown) = object.keys().find(|k| self.column_index(k).is_none()) {
            return Err(SyncError::UnknownColumn {
                column: unknown.clone(),
            });
        }

        let mut values = Vec::with_capacity(self.columns().len());
        for (index, column) in self.columns().iter().enumerate() {
            let value = match object.get(&column.name) {
                Some(json) => Some(coerce_value(&column.name, column.column_type, json)?),
                None => None,
            };
            match &value {
                Some(Value::Null) | None if self.is_key_column(index) => {
                    return Err(SyncError::MissingKey {
                        column: column.name.clone(),
                    });
                }
                Some(Value::Null) if !column.nullable => {
                    return Err(SyncError::NullViolation {
                        column: column.name.clone(),
                    });
                }
                _ => {}
            }
            values.push(value);
        }
        Ok(IncomingRow::new(values))
    }

    /// Validate a wire payload: either an array of row objects, or an
    /// object `{"table": "...", "data": [...]}` whose `table` (if present)
    /// names this schema's table.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` — any other top-level shape
    /// - `TableMismatch` — `table` names another table
    /// - `NotAnObject` — an element of the row array is not an object
    /// - any error from [`TableSchema::validate_row`]
    pub fn validate_payload(&self, payload: &Json) -> Result<Vec<IncomingRow>> {
        let rows = match payload {
            Json::Array(rows) => rows,
            Json::Object(envelope) => {
                if let Some(table) = envelope.get("table") {
                    let found = table.as_str().ok_or_else(|| SyncError::MalformedPayload {
                        reason: "`table` must be a string".to_string(),
                    })?;
                    if found != self.name() {
                        return Err(SyncError::TableMismatch {
                            expected: self.name().to_string(),
                            found: found.to_string(),
                        });
                    }
                }
                envelope
                    .get("data")
                    .and_then(Json::as_array)
                    .ok_or_else(|| SyncError::MalformedPayload {
                        reason: "expected a `data` array".to_string(),
                    })?
            }
            other => {
                return Err(SyncError::MalformedPayload {
                    reason: format!("expected an array of rows, got {}", describe(other)),
                })
            }
        };

        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let object = row.as_object().ok_or(SyncError::NotAnObject { index })?;
                self.validate_row(object)
            })
            .collect()
    }

    /// Resolve omitted columns and produce a complete row
    ///
    /// `previous` is the persisted row for the same key, if any; it is only
    /// consulted under `MissingColumnPolicy::KeepPrevious`.
    ///
    /// # Errors
    ///
    /// `NullViolation` when a NOT NULL column resolves to null.
    pub fn complete_row(
        &self,
        incoming: IncomingRow,
        policy: MissingColumnPolicy,
        previous: Option<&Row>,
    ) -> Result<Row> {
        let mut values = Vec::with_capacity(self.columns().len());
        for (index, (column, value)) in self
            .columns()
            .iter()
            .zip(incoming.into_values())
            .enumerate()
        {
            let resolved = match value {
                Some(v) => v,
                None => match (policy, previous.and_then(|p| p.get(index))) {
                    (MissingColumnPolicy::KeepPrevious, Some(prev)) => prev.clone(),
                    _ => column.default.clone().unwrap_or(Value::Null),
                },
            };
            if resolved.is_null() && !column.nullable {
                return Err(SyncError::NullViolation {
                    column: column.name.clone(),
                });
            }
            values.push(resolved);
        }
        Ok(Row::new(values))
    }

    /// Key of a validated incoming row
    pub fn key_of_incoming(&self, row: &IncomingRow) -> crate::model::PrimaryKey {
        crate::model::PrimaryKey::new(
            self.primary_key()
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }
}
