//! SQLite-backed storage for one synchronized table
//!
//! `SyncStore` owns the connection. Every mutation goes through a
//! `StoreTxn`, which begins IMMEDIATE (the write lock is taken up front)
//! and rolls back when dropped without `commit`.

#![allow(clippy::result_large_err)]

use crate::db::{self, ConnectionOptions};
use crate::errors::{from_rusqlite, reserved_table, schema_mismatch, Result};
use crate::migrations::{
    apply_migrations, compute_checksum, SCHEMA_VERSION_TABLE, SYNC_TABLES_TABLE,
};
use crate::repo::hydration::{hydrate_row, key_params, to_sql};
use crate::repo::sql;
use dbsync_core::model::{PrimaryKey, Row};
use dbsync_core::schema::TableSchema;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;

/// Statements rendered once per schema
#[derive(Debug)]
struct Statements {
    upsert: String,
    select_by_key: String,
    delete_by_key: String,
    scan_all: String,
    count: String,
}

impl Statements {
    fn new(schema: &TableSchema) -> Self {
        Self {
            upsert: sql::upsert(schema),
            select_by_key: sql::select_by_key(schema),
            delete_by_key: sql::delete_by_key(schema),
            scan_all: sql::scan_all(schema),
            count: sql::count(schema),
        }
    }
}

fn scan(conn: &Connection, schema: &TableSchema, statements: &Statements) -> Result<Vec<Row>> {
    let mut stmt = conn
        .prepare_cached(&statements.scan_all)
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| hydrate_row(schema, row))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

fn lookup(
    conn: &Connection,
    schema: &TableSchema,
    statements: &Statements,
    key: &PrimaryKey,
) -> Result<Option<Row>> {
    let mut stmt = conn
        .prepare_cached(&statements.select_by_key)
        .map_err(from_rusqlite)?;
    let row = stmt
        .query_row(params_from_iter(key_params(key.values())), |row| {
            hydrate_row(schema, row)
        })
        .optional()
        .map_err(from_rusqlite)?;
    Ok(row)
}

/// Names SQLite resolves to the store's metadata or its own internal tables
fn is_reserved_table(name: &str) -> bool {
    name.eq_ignore_ascii_case(SYNC_TABLES_TABLE)
        || name.eq_ignore_ascii_case(SCHEMA_VERSION_TABLE)
        || name
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"))
}

/// Persisted snapshot of one table
pub struct SyncStore {
    conn: Connection,
    schema: Arc<TableSchema>,
    statements: Statements,
}

impl SyncStore {
    /// Open (or create) the store at `path` for `schema`
    ///
    /// Applies metadata migrations and creates the table if absent.
    ///
    /// # Errors
    ///
    /// - `StorageError` if the backend cannot be opened or written
    /// - `SchemaError` if the store already holds the table under a
    ///   different schema, or the table name is reserved
    pub fn open<P: AsRef<Path>>(
        path: P,
        schema: Arc<TableSchema>,
        options: &ConnectionOptions,
    ) -> Result<Self> {
        if is_reserved_table(schema.name()) {
            return Err(reserved_table(schema.name()));
        }
        let mut conn = db::open(path, options)?;
        apply_migrations(&mut conn)?;

        let statements = Statements::new(&schema);
        let mut store = Self {
            conn,
            schema,
            statements,
        };
        store.create_table_if_absent()?;
        Ok(store)
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Create the physical table and record its schema checksum
    ///
    /// Idempotent for an unchanged schema.
    ///
    /// # Errors
    ///
    /// `SchemaError` when the recorded checksum differs from the declared
    /// schema's.
    pub fn create_table_if_absent(&mut self) -> Result<()> {
        let table = self.schema.name();
        let declared = compute_checksum(&self.schema.canonical_form());

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;

        let recorded: Option<String> = tx
            .query_row(
                &format!(
                    "SELECT ddl_checksum FROM {} WHERE table_name = ?1",
                    SYNC_TABLES_TABLE
                ),
                [table],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        match recorded {
            Some(recorded) if recorded != declared => {
                return Err(schema_mismatch(table, &recorded, &declared));
            }
            Some(_) => {}
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO {} (table_name, ddl_checksum, created_at) VALUES (?1, ?2, ?3)",
                        SYNC_TABLES_TABLE
                    ),
                    rusqlite::params![table, declared, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(from_rusqlite)?;
                tracing::debug!(table, checksum = %declared, "Registered synchronized table");
            }
        }

        tx.execute(&sql::create_table(&self.schema), [])
            .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    /// Begin a write transaction
    ///
    /// # Errors
    ///
    /// `StorageError` (typically `SQLITE_BUSY`) when another connection
    /// holds the write lock past the busy timeout.
    pub fn begin(&mut self) -> Result<StoreTxn<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;
        Ok(StoreTxn {
            tx,
            schema: &self.schema,
            statements: &self.statements,
        })
    }

    /// Committed snapshot, primary key ascending
    pub fn scan_all(&self) -> Result<Vec<Row>> {
        scan(&self.conn, &self.schema, &self.statements)
    }

    pub fn get(&self, key: &PrimaryKey) -> Result<Option<Row>> {
        lookup(&self.conn, &self.schema, &self.statements, key)
    }

    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&self.statements.count, [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Open write transaction on a `SyncStore`
pub struct StoreTxn<'a> {
    tx: Transaction<'a>,
    schema: &'a TableSchema,
    statements: &'a Statements,
}

impl StoreTxn<'_> {
    /// Insert or replace a complete row, keyed by its primary key
    pub fn upsert(&self, row: &Row) -> Result<()> {
        let mut stmt = self
            .tx
            .prepare_cached(&self.statements.upsert)
            .map_err(from_rusqlite)?;
        stmt.execute(params_from_iter(row.values().iter().map(to_sql)))
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get(&self, key: &PrimaryKey) -> Result<Option<Row>> {
        lookup(&self.tx, self.schema, self.statements, key)
    }

    /// Remove the row with `key`; returns whether a row existed
    pub fn delete(&self, key: &PrimaryKey) -> Result<bool> {
        let mut stmt = self
            .tx
            .prepare_cached(&self.statements.delete_by_key)
            .map_err(from_rusqlite)?;
        let removed = stmt
            .execute(params_from_iter(key_params(key.values())))
            .map_err(from_rusqlite)?;
        Ok(removed > 0)
    }

    /// Snapshot as seen inside this transaction, primary key ascending
    pub fn scan_all(&self) -> Result<Vec<Row>> {
        scan(&self.tx, self.schema, self.statements)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(from_rusqlite)
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback().map_err(from_rusqlite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsync_core::model::Value;
    use dbsync_core::schema::parse_schema;

    fn store() -> SyncStore {
        let schema = Arc::new(
            parse_schema("files(path TEXT PRIMARY KEY, size INT, hash TEXT, ok BOOLEAN)").unwrap(),
        );
        let options = ConnectionOptions {
            engine: dbsync_core::model::DbEngineType::InMemory,
            ..ConnectionOptions::default()
        };
        SyncStore::open("memory", schema, &options).unwrap()
    }

    fn row(path: &str, size: i64) -> Row {
        Row::new(vec![
            Value::from(path),
            Value::from(size),
            Value::Null,
            Value::from(true),
        ])
    }

    fn key(path: &str) -> PrimaryKey {
        PrimaryKey::new(vec![Value::from(path)])
    }

    #[test]
    fn test_reserved_table_names_rejected() {
        let options = ConnectionOptions {
            engine: dbsync_core::model::DbEngineType::InMemory,
            ..ConnectionOptions::default()
        };
        for name in ["dbsync_tables", "DBSYNC_SCHEMA_VERSION", "sqlite_stat1"] {
            let schema =
                Arc::new(parse_schema(&format!("{}(path TEXT PRIMARY KEY, size INT)", name)).unwrap());
            let err = SyncStore::open("memory", schema, &options).err().unwrap();
            assert_eq!(err.kind(), dbsync_core::errors::ExErrorKind::SchemaError, "{}", name);
        }

        assert!(!is_reserved_table("dbsync_processes"));
        assert!(!is_reserved_table("sqlite"));
    }

    #[test]
    fn test_upsert_get_delete() {
        let mut store = store();
        let txn = store.begin().unwrap();
        txn.upsert(&row("/a", 1)).unwrap();
        txn.upsert(&row("/a", 2)).unwrap();
        assert_eq!(txn.get(&key("/a")).unwrap(), Some(row("/a", 2)));
        assert!(txn.delete(&key("/a")).unwrap());
        assert!(!txn.delete(&key("/a")).unwrap());
        txn.commit().unwrap();
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn test_scan_is_key_ordered() {
        let mut store = store();
        let txn = store.begin().unwrap();
        for path in ["/c", "/a", "/b"] {
            txn.upsert(&row(path, 1)).unwrap();
        }
        txn.commit().unwrap();

        let paths: Vec<Value> = store
            .scan_all()
            .unwrap()
            .into_iter()
            .map(|r| r.values()[0].clone())
            .collect();
        assert_eq!(
            paths,
            vec![Value::from("/a"), Value::from("/b"), Value::from("/c")]
        );
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = store();
        {
            let txn = store.begin().unwrap();
            txn.upsert(&row("/a", 1)).unwrap();
        }
        assert_eq!(store.row_count().unwrap(), 0);

        let txn = store.begin().unwrap();
        txn.upsert(&row("/a", 1)).unwrap();
        txn.rollback().unwrap();
        assert!(store.get(&key("/a")).unwrap().is_none());
    }
}
