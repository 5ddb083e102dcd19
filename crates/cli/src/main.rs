//! kmz2csv command line.
//!
//! Converts KMZ/KML files locally and manages the geocode cache shared with
//! the server. Logs go to stderr so CSV can be piped from stdout.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use kmz2csv_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "kmz2csv")]
#[command(version, about = "Convert KMZ/KML placemarks to CSV with cached street names", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a .kmz or .kml file to CSV
    Convert {
        /// Input file (.kmz or .kml)
        input: PathBuf,

        /// Output file; CSV goes to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Look up a street name for every point
        #[arg(long)]
        geocode: bool,
    },

    /// Inspect or maintain the geocode cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show entry counts and fetch-time range
    Stats,

    /// Show the cached answer for a coordinate
    Get {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Delete cache entries
    #[command(group(
        ArgGroup::new("criteria").required(true).multiple(true).args(["older_than_days", "unresolved", "all"])
    ))]
    Purge {
        /// Entries fetched more than N days ago (and entries without a fetch time)
        #[arg(long)]
        older_than_days: Option<i64>,

        /// Entries where no street was found
        #[arg(long)]
        unresolved: bool,

        /// Every entry
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Convert { input, output, geocode } => {
            commands::convert::run(&config, &input, output.as_deref(), geocode).await
        }
        Commands::Cache { command } => match command {
            CacheCommands::Stats => commands::cache::stats(&config).await,
            CacheCommands::Get { lat, lon } => commands::cache::get(&config, lat, lon).await,
            CacheCommands::Purge { older_than_days, unresolved, all } => {
                commands::cache::purge(&config, commands::cache::PurgeCriteria { older_than_days, unresolved, all })
                    .await
            }
        },
    }
}
