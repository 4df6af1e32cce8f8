use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use maps_grid_scraper::categories::TOP_COMPANY_TYPES;
use maps_grid_scraper::{scrape_places, AppState, ProgressObserver, SearchInput, SearchProgress};

#[derive(Debug, Parser)]
#[command(name = "maps-grid-scraper", about = "Collect business listings for a city")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a search and print the JSON payload.
    Search {
        #[arg(long)]
        city: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        district: String,
        /// Maximum number of records (clamped to MAX_RESULTS).
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        pretty: bool,
    },
    /// List the suggested business categories.
    Categories,
    /// Print the effective configuration without secrets.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let state = AppState::initialize();

    match cli.command {
        Command::Search {
            city,
            category,
            district,
            limit,
            pretty,
        } => {
            let cancel_flag = Arc::new(AtomicBool::new(false));
            let signal_flag = Arc::clone(&cancel_flag);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received; finishing in-flight work");
                    signal_flag.store(true, Ordering::SeqCst);
                }
            });

            let observer: ProgressObserver = Arc::new(|progress: SearchProgress| {
                info!(
                    cells_completed = progress.cells_completed,
                    cells_total = progress.cells_total,
                    records_found = progress.records_found,
                    "progress"
                );
            });
            let input = SearchInput {
                district,
                city,
                category,
                result_cap: limit,
            };
            let payload = scrape_places(&state, input, Some(observer), Some(cancel_flag)).await;
            let rendered = if pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            println!("{rendered}");
            if !payload.is_success() {
                std::process::exit(1);
            }
        }
        Command::Categories => {
            for category in TOP_COMPANY_TYPES {
                println!("{category}");
            }
        }
        Command::Config => {
            println!(
                "{}",
                serde_json::to_string_pretty(&state.config().public_profile())?
            );
        }
    }

    Ok(())
}
