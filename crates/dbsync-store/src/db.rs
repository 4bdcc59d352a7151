//! Database connection management
//!
//! Opens and configures the SQLite connection behind one handle.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, io_error, Result};
use dbsync_core::model::{DbEngineType, HostType};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Connection settings fixed when a handle is initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub engine: DbEngineType,
    pub host: HostType,
    /// How long a writer waits on a lock held by another connection
    pub busy_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            engine: DbEngineType::default(),
            host: HostType::default(),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a connection for `path` according to `options` and configure it
///
/// File stores get their parent directories created on demand. For
/// `DbEngineType::InMemory` the path is only a label.
pub fn open<P: AsRef<Path>>(path: P, options: &ConnectionOptions) -> Result<Connection> {
    let conn = match options.engine {
        DbEngineType::Sqlite3 => {
            let path = path.as_ref();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| io_error("open_store", e))?;
            }
            Connection::open(path).map_err(from_rusqlite)?
        }
        DbEngineType::InMemory => open_in_memory()?,
    };
    configure(&conn, options)?;
    Ok(conn)
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Apply journaling, durability and lock-wait settings
///
/// Manager hosts use `synchronous=FULL`, agents `synchronous=NORMAL`.
pub fn configure(conn: &Connection, options: &ConnectionOptions) -> Result<()> {
    conn.busy_timeout(options.busy_timeout)
        .map_err(from_rusqlite)?;

    if options.engine == DbEngineType::Sqlite3 {
        // journal_mode answers with the resulting mode, so it must be read
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        tracing::debug!(journal_mode = %mode, "Configured journal mode");
    }

    let synchronous = match options.host {
        HostType::Manager => "FULL",
        HostType::Agent => "NORMAL",
    };
    conn.pragma_update(None, "synchronous", synchronous)
        .map_err(from_rusqlite)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synchronous(conn: &Connection) -> i64 {
        conn.query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_host_type_selects_durability() {
        let dir = tempfile::tempdir().unwrap();

        let manager = ConnectionOptions {
            host: HostType::Manager,
            ..ConnectionOptions::default()
        };
        let conn = open(dir.path().join("manager.db"), &manager).unwrap();
        assert_eq!(synchronous(&conn), 2);

        let conn = open(dir.path().join("agent.db"), &ConnectionOptions::default()).unwrap();
        assert_eq!(synchronous(&conn), 1);
    }

    #[test]
    fn test_file_store_uses_wal_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("sync.db");

        let conn = open(&path, &ConnectionOptions::default()).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert!(path.exists());
    }

    #[test]
    fn test_in_memory_engine_ignores_path() {
        let options = ConnectionOptions {
            engine: DbEngineType::InMemory,
            ..ConnectionOptions::default()
        };
        let conn = open("/nonexistent/dir/label.db", &options).unwrap();
        assert!(!Path::new("/nonexistent/dir/label.db").exists());
        conn.execute_batch("CREATE TABLE t (a INTEGER)").unwrap();
    }

    #[test]
    fn test_unwritable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        // a regular file cannot be a parent directory
        let err = open(blocker.join("sync.db"), &ConnectionOptions::default()).unwrap_err();
        assert_eq!(
            err.kind(),
            dbsync_core::errors::ExErrorKind::StorageError
        );
    }
}
