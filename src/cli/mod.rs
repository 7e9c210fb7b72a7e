//! CLI module for hls-remux
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// hls-remux
///
/// Copies the audio and video of a local HLS playlist into a single MP4
/// without re-encoding, retrying video-only when the audio cannot be muxed.
#[derive(Parser, Debug)]
#[command(name = "hls-remux")]
#[command(about = "Lossless HLS playlist to MP4 remuxer")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info", env = "HLS_REMUX_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to ./hls_remux.toml when present)
    #[arg(long, env = "HLS_REMUX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remux a playlist into a single MP4 file
    Remux(args::RemuxArgs),
    /// Show the streams of a playlist and what each policy would carry
    Inspect(args::InspectArgs),
}
