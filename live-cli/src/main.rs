//! # livewatch
//!
//! Terminal front end for the livewatch event stream.
//!
//! ## Commands
//!
//! - `watch`: Follow the live stream, with backoff and notifications
//! - `fetch`: Retrieve one page of events as JSON lines
//! - `health`: Probe the events API
//!
//! ## Example
//!
//! ```bash
//! # Follow the stream from a local API
//! livewatch watch
//!
//! # Start paused against another backend
//! livewatch --api https://hunt.example.org/api watch --paused
//!
//! # Everything after a given instant
//! livewatch fetch --since 2024-03-01T12:00:00Z --limit 50
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{fetch, health, watch};

/// Terminal front end for the livewatch event stream.
#[derive(Parser, Debug)]
#[command(name = "livewatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: livewatch.toml in the config directory)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Events API base URL, overriding the config file
    #[arg(long, global = true)]
    api: Option<String>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow the live event stream
    Watch {
        /// Start with polling switched off
        #[arg(long)]
        paused: bool,
    },

    /// Fetch one page of events and print them as JSON lines
    Fetch {
        /// Only events after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,

        /// Maximum number of events (default: sync.page_size)
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Check whether the events API is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load(cli.config.as_deref(), cli.api.as_deref())?;

    match cli.command {
        Commands::Watch { paused } => {
            watch::run(&config, paused).await?;
        }
        Commands::Fetch { since, limit } => {
            fetch::run(&config, since.as_deref(), limit).await?;
        }
        Commands::Health => {
            health::run(&config).await?;
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "livewatch=debug"
    } else {
        "livewatch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
