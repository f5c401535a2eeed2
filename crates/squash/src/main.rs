//! Squash CLI - compress upload images to a bounded size.
//!
//! HEIC/HEIF photos are passed through untouched; JPEG, PNG and WebP are
//! decoded, scaled down to a maximum edge and re-encoded as lossy WebP.
//!
//! # Usage
//!
//! ```bash
//! # Compress a single image into ./compressed
//! squash compress review.jpg
//!
//! # Compress a directory, printing a JSONL report
//! squash compress ./uploads/ -o ./out --report jsonl
//!
//! # See what would happen without decoding anything
//! squash inspect ./uploads/
//!
//! # View configuration
//! squash config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Squash - upload image normalization and compression.
#[derive(Parser, Debug)]
#[command(name = "squash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress images into an output directory
    Compress(cli::compress::CompressArgs),

    /// Show how each file would be handled, without decoding
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match squash_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `squash config path`."
            );
            squash_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Squash v{}", squash_core::VERSION);

    match cli.command {
        Commands::Compress(args) => cli::compress::execute(config, args).await,
        Commands::Inspect(args) => cli::inspect::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
