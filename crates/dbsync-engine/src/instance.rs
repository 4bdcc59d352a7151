//! One live synchronized table: schema, storage connection and sink.

#![allow(clippy::result_large_err)]

use crate::config::SyncOptions;
use dbsync_core::errors::ExError;
use dbsync_core::model::{DbEngineType, HostType};
use dbsync_core::schema::{parse_schema, TableSchema};
use dbsync_store::errors::Result;
use dbsync_store::SyncStore;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receives one message per failed call on a handle
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

pub struct Instance {
    host: HostType,
    engine: DbEngineType,
    storage_path: PathBuf,
    schema: Arc<TableSchema>,
    options: SyncOptions,
    /// Serializes every operation on this handle
    store: Mutex<SyncStore>,
    log_sink: Mutex<Option<LogSink>>,
}

impl Instance {
    /// Parse the schema and open its store
    ///
    /// # Errors
    ///
    /// - `SchemaError` for an invalid schema, or one that differs from the
    ///   schema recorded in an existing store
    /// - `StorageError` if the store cannot be opened
    pub fn open(
        host: HostType,
        engine: DbEngineType,
        storage_path: &Path,
        schema_ddl: &str,
        options: SyncOptions,
    ) -> Result<Self> {
        let schema = Arc::new(parse_schema(schema_ddl).map_err(ExError::from)?);
        let store = SyncStore::open(
            storage_path,
            schema.clone(),
            &options.connection_options(host, engine),
        )
        .map_err(|e| e.with_table(schema.name()))?;

        Ok(Self {
            host,
            engine,
            storage_path: storage_path.to_path_buf(),
            schema,
            options,
            store: Mutex::new(store),
            log_sink: Mutex::new(None),
        })
    }

    pub fn host(&self) -> HostType {
        self.host
    }

    pub fn engine(&self) -> DbEngineType {
        self.engine
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Acquire the per-handle lock for the duration of one operation
    ///
    /// A poisoned lock is recovered: an unwinding operation dropped its
    /// transaction, which rolled back.
    pub(crate) fn lock_store(&self) -> MutexGuard<'_, SyncStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_log_sink(&self, sink: Option<LogSink>) {
        *self.log_sink.lock().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    pub fn has_log_sink(&self) -> bool {
        self.log_sink
            .lock()
            .map(|sink| sink.is_some())
            .unwrap_or(false)
    }

    /// Forward a failure message to the attached sink, if any
    pub fn log(&self, message: &str) {
        let sink = self
            .log_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink(message);
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("table", &self.schema.name())
            .field("host", &self.host)
            .field("engine", &self.engine)
            .field("storage_path", &self.storage_path)
            .finish()
    }
}
