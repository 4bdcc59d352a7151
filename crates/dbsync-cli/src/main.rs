//! dbsync CLI
//!
//! Loads and diffs JSON snapshot files against a synchronized table store

use clap::{Parser, Subcommand};
use dbsync_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "dbsync")]
#[command(about = "dbsync - Snapshot synchronization for SQLite tables", long_about = None)]
struct Cli {
    /// Human-readable debug logs on stderr instead of JSON
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bulk insert rows from a JSON file
    Load(commands::load::LoadArgs),
    /// Replace the table with a snapshot and print the changes
    Sync(commands::sync::SyncArgs),
    /// Print the persisted rows
    Dump(commands::dump::DumpArgs),
}

fn main() {
    let cli = Cli::parse();

    logging_facility::init(if cli.verbose {
        Profile::Development
    } else {
        Profile::Production
    });

    let result = match cli.command {
        Commands::Load(args) => commands::load::execute(args),
        Commands::Sync(args) => commands::sync::execute(args),
        Commands::Dump(args) => commands::dump::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
