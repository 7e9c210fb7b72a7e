//! Command-line argument definitions

use clap::Args;

/// Arguments for the remux command
#[derive(Args, Debug)]
pub struct RemuxArgs {
    /// Source playlist path or locator
    #[arg(short, long)]
    pub input: String,

    /// Destination MP4 path (overwritten if it exists)
    #[arg(short, long)]
    pub output: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Fail before writing anything when video frame size stays unknown
    #[arg(long)]
    pub strict_dimensions: bool,

    /// Packets to read while waiting for video frame size
    #[arg(long)]
    pub probe_packets: Option<usize>,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Source playlist path or locator
    #[arg(short, long)]
    pub input: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
