//! Subcommands. Each opens its own handle on a private registry.

pub mod dump;
pub mod load;
pub mod sync;

use clap::Args;
use dbsync_core::model::{DbEngineType, HostType};
use dbsync_core::schema::MissingColumnPolicy;
use dbsync_engine::{Handle, Registry, SyncOptions};
use std::path::{Path, PathBuf};

/// Store selection shared by every subcommand
#[derive(Debug, Args)]
pub struct StoreArgs {
    #[arg(long, default_value = ".dbsync/store.db")]
    pub db: String,

    /// File holding the table DDL
    #[arg(long)]
    pub schema: PathBuf,

    #[arg(long, default_value = "agent")]
    pub host: HostType,

    /// `sqlite3` or `memory`
    #[arg(long, default_value = "sqlite3")]
    pub engine: DbEngineType,

    /// Keep persisted values for columns a row omits
    #[arg(long)]
    pub keep_missing: bool,
}

impl StoreArgs {
    pub fn options(&self) -> SyncOptions {
        let policy = if self.keep_missing {
            MissingColumnPolicy::KeepPrevious
        } else {
            MissingColumnPolicy::Null
        };
        SyncOptions::default().with_missing_columns(policy)
    }

    pub fn open(
        &self,
        registry: &Registry,
        options: SyncOptions,
    ) -> Result<Handle, Box<dyn std::error::Error>> {
        let ddl = std::fs::read_to_string(&self.schema)
            .map_err(|e| format!("cannot read schema {}: {}", self.schema.display(), e))?;
        let handle = registry.initialize(self.host, self.engine, &self.db, &ddl, options, None)?;
        Ok(handle)
    }
}

pub fn read_json(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&text).map_err(dbsync_core::ExError::from)?)
}
