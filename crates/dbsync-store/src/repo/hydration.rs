//! Conversion between typed values and SQLite storage values.
//!
//! Reads are driven by the declared column type, not by SQLite's dynamic
//! type, so a boolean column stored as INTEGER comes back as a boolean.

use dbsync_core::model::{ColumnType, Row, Value};
use dbsync_core::schema::TableSchema;
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Storage form of one value
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// Typed form of one stored value
///
/// # Errors
///
/// `InvalidColumnType` when the stored value cannot represent the declared
/// column type (for example text in an INTEGER column written by a foreign
/// tool).
pub fn from_sql(
    index: usize,
    name: &str,
    column_type: ColumnType,
    raw: ValueRef<'_>,
) -> rusqlite::Result<Value> {
    let mismatch = || rusqlite::Error::InvalidColumnType(index, name.to_string(), raw.data_type());

    let value = match (column_type, raw) {
        (_, ValueRef::Null) => Value::Null,
        (ColumnType::Integer, ValueRef::Integer(i)) => Value::Integer(i),
        (ColumnType::Real, ValueRef::Real(r)) => Value::real(r),
        (ColumnType::Real, ValueRef::Integer(i)) => Value::real(i as f64),
        (ColumnType::Text, ValueRef::Text(bytes)) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(rusqlite::Error::Utf8Error)?
                .to_string(),
        ),
        (ColumnType::Boolean, ValueRef::Integer(0)) => Value::Boolean(false),
        (ColumnType::Boolean, ValueRef::Integer(1)) => Value::Boolean(true),
        _ => return Err(mismatch()),
    };
    Ok(value)
}

/// Read one complete row in schema column order
pub fn hydrate_row(schema: &TableSchema, row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let values = schema
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| from_sql(i, &column.name, column.column_type, row.get_ref(i)?))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Row::new(values))
}

/// Bind parameters for a key predicate
pub fn key_params(values: &[Value]) -> Vec<SqlValue> {
    values.iter().map(to_sql).collect()
}
