use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use roster_indexer::{commands, logging, Dependencies, IndexerSettings};
use roster_shared::{Alias, SearchQuery};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "roster-indexer")]
#[command(about = "Load roster files into the graph store and search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a roster CSV file
    Import {
        /// Path to the CSV file
        path: PathBuf,
    },
    /// Search an alias (membership or people)
    Search {
        alias: Alias,
        /// Query text; omit to match everything
        query: Option<String>,
        /// Maximum number of hits to print
        #[arg(long, default_value_t = SearchQuery::DEFAULT_SIZE)]
        size: usize,
    },
    /// Print node counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let deps = Dependencies::new(IndexerSettings::from_env()?);

    match cli.command {
        Commands::Import { path } => {
            let cancel = CancellationToken::new();
            let signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                    signal.cancel();
                }
            });

            let report = commands::import(&deps, &path, cancel).await?;
            if report.cancelled {
                warn!(
                    last_committed_row = ?report.last_committed_row,
                    "Import cancelled"
                );
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { alias, query, size } => {
            let response = commands::search(&deps, alias, query, size).await?;
            for line in commands::format_hits(&response) {
                println!("{line}");
            }
        }
        Commands::Stats => {
            let stats = commands::stats(&deps).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
