//! hls-remux
//!
//! Copies a local HLS playlist into a single MP4 file without re-encoding.
//!
//! # Usage
//!
//! ```bash
//! hls-remux remux -i downloads/show/index.m3u8 -o show.mp4
//! hls-remux inspect -i downloads/show/index.m3u8 --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use hls_remux::adapters::{init_logging, LogLevel};
use hls_remux::cli::{commands, Cli, Commands};

/// Main entry point for the hls-remux CLI
fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = LogLevel::parse(&cli.log_level)?;
    init_logging(level, cli.log_json)?;

    info!("Starting hls-remux");
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Remux(args) => {
            info!("Executing remux command");
            commands::remux(args, config_path.as_deref())?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(args, config_path.as_deref())?;
        }
    }

    info!("hls-remux completed successfully");
    Ok(())
}
