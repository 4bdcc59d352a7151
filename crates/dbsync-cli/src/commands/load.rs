//! Bulk load command

use super::{read_json, StoreArgs};
use clap::Args;
use dbsync_engine::Registry;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// JSON array of rows, or `{"table": ..., "data": [...]}`
    pub rows: PathBuf,
}

pub fn execute(args: LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let payload = read_json(&args.rows)?;

    let registry = Registry::new();
    let handle = args.store.open(&registry, args.store.options())?;
    let count = dbsync_engine::insert_bulk_data(&registry, handle, &payload)?;
    let table = registry.get(handle)?.schema().name().to_string();
    registry.teardown();

    println!("Loaded {} rows into {}", count, table);
    Ok(())
}
