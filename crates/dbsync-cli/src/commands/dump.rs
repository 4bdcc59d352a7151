//! Dump command

use super::StoreArgs;
use clap::Args;
use dbsync_engine::Registry;

#[derive(Debug, Args)]
pub struct DumpArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: DumpArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::new();
    let handle = args.store.open(&registry, args.store.options())?;
    let schema = registry.get(handle)?.schema().clone();
    let rows = dbsync_engine::select_all(&registry, handle)?;
    registry.teardown();

    let rows: Vec<_> = rows.iter().map(|row| schema.row_to_json(row)).collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
