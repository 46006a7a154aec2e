//! trestle-sync - pages active listings out of the Trestle OData API
//!
//! Authenticates with OAuth2 client credentials and follows
//! `@odata.nextLink` cursors until the collection is exhausted.

mod api;
mod auth;
mod config;
mod error;
mod models;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "trestle-sync")]
#[command(about = "Page active listings out of the Trestle OData API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire an access token and show when it expires
    Token,

    /// Fetch all matching listings as newline-delimited JSON
    Fetch {
        /// Stop after this many page requests (overrides config)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count listings matching the configured filter
    Count,

    /// Show a single listing
    Get {
        /// ListingKey of the property
        listing_key: String,
    },

    /// Print the config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr, so stdout stays clean for listing output)
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Token => {
            tracing::info!("Requesting access token...");
            auth::check().await?;
        }
        Commands::Fetch { max_pages, output } => {
            tracing::info!("Fetching active listings...");
            api::fetch(max_pages, output.as_deref()).await?;
        }
        Commands::Count => {
            api::count().await?;
        }
        Commands::Get { listing_key } => {
            api::get(&listing_key).await?;
        }
        Commands::ConfigPath => {
            println!("{}", config::Config::config_path()?.display());
        }
    }

    Ok(())
}
