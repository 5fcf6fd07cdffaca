//! flux-capture: CLI for the local capture store
//!
//! Ingests captured events into the `fluxCollections` store and inspects,
//! exports, backs up and restores it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod capture;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "flux-capture")]
#[command(about = "Local capture store for collected data", long_about = None)]
#[command(version)]
struct Cli {
    /// Store database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append COLLECT_DATA events from NDJSON input to the store
    Ingest {
        /// NDJSON file with one event per line (reads stdin if omitted)
        #[arg(long, short)]
        file: Option<String>,

        /// Keep only the newest N entries, N >= 1 (unbounded if omitted)
        #[arg(long)]
        capacity: Option<NonZeroUsize>,

        /// Largest accepted payload in bytes
        #[arg(long, default_value_t = config::DEFAULT_MAX_PAYLOAD_BYTES)]
        max_payload_bytes: usize,
    },

    /// List stored entries
    List {
        /// Show newest entries first
        #[arg(long, short)]
        reverse: bool,

        /// Limit number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show storage statistics
    Stats,

    /// Export the collection
    Export {
        /// Output format: json, ndjson or events (default: json)
        #[arg(long, short, default_value = "json")]
        format: String,

        /// Output file (prints to stdout if omitted)
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Backup the store database
    Backup {
        /// Output backup file (will add .tar.gz if not present)
        backup_file: String,
    },

    /// Restore the store database from a backup
    Restore {
        /// Backup file to restore from
        backup_file: String,

        /// Replace a store that already holds entries
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = config::resolve_store_path(cli.db)?;
    tracing::debug!(store = %db_path.display(), "using store");

    match cli.command {
        Commands::Ingest {
            file,
            capacity,
            max_payload_bytes,
        } => {
            let options = commands::ingest::IngestOptions {
                capacity: capture::Capacity::from_limit(capacity),
                limits: config::CaptureLimits { max_payload_bytes },
            };
            let summary = commands::ingest::execute(&db_path, file.as_deref(), options).await?;
            println!("{}", commands::ingest::format_summary(&summary));
        }

        Commands::List { reverse, limit } => {
            let options = commands::list::ListOptions { reverse, limit };
            let output = commands::list::execute(&db_path, options)?;
            println!("{}", output);
        }

        Commands::Stats => {
            let stats = commands::stats::stats(&db_path)?;
            println!("{}", commands::stats::format_stats(&stats));
        }

        Commands::Export { format, output } => {
            let format = commands::export::ExportFormat::from_str(&format)
                .context("Invalid format. Use 'json', 'ndjson' or 'events'")?;
            commands::export::execute(&db_path, format, output.as_deref())?;
        }

        Commands::Backup { backup_file } => {
            commands::backup::execute(&db_path, &backup_file)?;
        }

        Commands::Restore { backup_file, force } => {
            if force {
                println!("{}", "(FORCE MODE - existing entries will be replaced)".blue());
            }
            let restored = commands::restore::execute(&backup_file, &db_path, force)?;
            println!("Restored {} entries.", restored);
        }
    }

    Ok(())
}
