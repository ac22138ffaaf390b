//! genreod CLI - index an audio library by tag profile and flag tracks that
//! do not fit a reference set.
//!
//! # Usage
//!
//! ```bash
//! # Tag every track under the library root into a snapshot
//! genreod index ~/Music --output library.json
//!
//! # Score two artists against one reference album
//! genreod detect --library ~/Music --snapshot library.json \
//!     --inlier "Artist/Album" --outlier "Other Artist" --outlier "Third Artist"
//!
//! # View configuration
//! genreod config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// genreod - Tag-profile indexing and genre outlier detection for audio libraries.
#[derive(Parser, Debug)]
#[command(name = "genreod")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "GENREOD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag audio files and write a library snapshot
    Index(cli::index::IndexArgs),

    /// Score groups of tracks against a reference set
    Detect(cli::detect::DetectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let loaded = match &cli.config {
        Some(path) => genreod_core::Config::load_from(&cli::expand(path)),
        None => genreod_core::Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `genreod config path`."
            );
            genreod_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("genreod v{}", genreod_core::VERSION);

    match cli.command {
        Commands::Index(args) => cli::index::execute(args, config).await,
        Commands::Detect(args) => cli::detect::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config, cli.config).await,
    }
}
