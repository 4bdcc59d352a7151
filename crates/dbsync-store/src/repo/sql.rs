//! SQL text for one table schema.
//!
//! Identifiers are validated by the schema parser and are additionally
//! quoted here. Booleans are stored as INTEGER 0/1. Declared DEFAULTs are
//! not rendered: missing values are resolved before rows reach the store.

use dbsync_core::model::ColumnType;
use dbsync_core::schema::TableSchema;

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn storage_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer | ColumnType::Boolean => "INTEGER",
        ColumnType::Real => "REAL",
        ColumnType::Text => "TEXT",
    }
}

fn column_list(schema: &TableSchema) -> String {
    schema
        .columns()
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn key_list(schema: &TableSchema) -> String {
    schema
        .primary_key_columns()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"a" = ?1 AND "b" = ?2` over the key columns
fn key_predicate(schema: &TableSchema) -> String {
    schema
        .primary_key_columns()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quote_ident(&c.name), i + 1))
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub fn create_table(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(&c.name), storage_type(c.column_type));
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
        quote_ident(schema.name()),
        columns.join(", "),
        key_list(schema)
    )
}

pub fn upsert(schema: &TableSchema) -> String {
    let placeholders: Vec<String> = (1..=schema.columns().len())
        .map(|i| format!("?{}", i))
        .collect();
    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_ident(schema.name()),
        column_list(schema),
        placeholders.join(", ")
    )
}

pub fn select_by_key(schema: &TableSchema) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        column_list(schema),
        quote_ident(schema.name()),
        key_predicate(schema)
    )
}

pub fn delete_by_key(schema: &TableSchema) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(schema.name()),
        key_predicate(schema)
    )
}

pub fn scan_all(schema: &TableSchema) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(schema),
        quote_ident(schema.name()),
        key_list(schema)
    )
}

pub fn count(schema: &TableSchema) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_ident(schema.name()))
}
