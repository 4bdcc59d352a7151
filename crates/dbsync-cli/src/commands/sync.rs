//! Snapshot sync command

use super::{read_json, StoreArgs};
use clap::Args;
use dbsync_core::diff::SnapshotMode;
use dbsync_engine::Registry;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Treat the snapshot as an upsert set; nothing is deleted
    #[arg(long)]
    pub partial: bool,

    /// Complete table snapshot
    pub snapshot: PathBuf,
}

pub fn execute(args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let payload = read_json(&args.snapshot)?;
    let mode = if args.partial {
        SnapshotMode::Partial
    } else {
        SnapshotMode::Full
    };

    let registry = Registry::new();
    let handle = args
        .store
        .open(&registry, args.store.options().with_snapshot_mode(mode))?;
    let changes = dbsync_engine::update_snapshot_data(&registry, handle, &payload, None)?;
    registry.teardown();

    println!("{}", serde_json::to_string_pretty(&changes.to_json())?);
    Ok(())
}
