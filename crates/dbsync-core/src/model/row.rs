//! Rows and primary keys.
//!
//! Both are positional: values are stored in the owning schema's column
//! order (for `Row`) or primary-key declaration order (for `PrimaryKey`).
//! Rendering to named JSON goes through `TableSchema`.

use crate::model::Value;
use std::fmt;

/// A complete row: one value per schema column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A validated row as observed in one payload.
///
/// `None` marks a non-key column the payload did not mention; it is
/// resolved by `TableSchema::complete_row` according to the
/// missing-column policy. Key columns are always `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRow {
    values: Vec<Option<Value>>,
}

impl IncomingRow {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}

/// Primary key values in key declaration order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrimaryKey(Vec<Value>);

impl PrimaryKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_ordering_is_lexicographic() {
        let a = PrimaryKey::new(vec![Value::from("/a"), Value::from(2)]);
        let b = PrimaryKey::new(vec![Value::from("/a"), Value::from(10)]);
        let c = PrimaryKey::new(vec![Value::from("/b"), Value::from(1)]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_primary_key_display() {
        let key = PrimaryKey::new(vec![Value::from("/a"), Value::from(7)]);
        assert_eq!(key.to_string(), "(\"/a\", 7)");
    }

    #[test]
    fn test_row_set_ignores_out_of_range() {
        let mut row = Row::new(vec![Value::from(1)]);
        row.set(5, Value::Null);
        row.set(0, Value::from(2));
        assert_eq!(row.values(), &[Value::from(2)]);
    }
}
