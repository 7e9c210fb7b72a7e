//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::app::container::DefaultAppContainer;
use crate::app::{InspectReport, RemuxRequest};
use crate::cli::args::{InspectArgs, RemuxArgs};
use crate::config_initialization::{resolve_config, ConfigOverrides};
use crate::domain::errors::RemuxError;
use crate::domain::model::{MappingPolicy, RemuxReport};

/// Final line printed by the remux command
#[derive(Debug, Serialize)]
pub struct RemuxSummary {
    /// 0 on success, otherwise the negative error code
    pub ret: i32,
    pub output: String,
    /// Size of the destination file on disk
    pub bytes: u64,
    pub policy: Option<MappingPolicy>,
    pub attempts: usize,
    pub streams: usize,
    pub packets_written: u64,
    pub packets_skipped: u64,
    pub error: Option<String>,
}

impl RemuxSummary {
    fn success(report: &RemuxReport) -> Self {
        Self {
            ret: 0,
            output: report.output.clone(),
            bytes: file_size(&report.output),
            policy: Some(report.policy),
            attempts: report.attempts,
            streams: report.streams_written,
            packets_written: report.stats.packets_written,
            packets_skipped: report.stats.packets_skipped,
            error: None,
        }
    }

    fn failure(output: &str, error: &RemuxError) -> Self {
        let attempts = match error {
            RemuxError::BadArgs(_) => 0,
            _ => MappingPolicy::FALLBACK_ORDER.len(),
        };
        Self {
            ret: error.code(),
            output: output.to_string(),
            bytes: file_size(output),
            policy: None,
            attempts,
            streams: 0,
            packets_written: 0,
            packets_skipped: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Execute the remux command
pub fn remux(args: RemuxArgs, config_path: Option<&Path>) -> Result<()> {
    info!("Input: {}", args.input);
    info!("Output: {}", args.output);

    let overrides = ConfigOverrides {
        strict_dimensions: args.strict_dimensions,
        dimension_probe_packets: args.probe_packets,
    };
    let config = resolve_config(config_path, &overrides).context("Failed to resolve configuration")?;
    let container = DefaultAppContainer::new(config).context("Failed to initialize libav")?;

    let request = RemuxRequest::new(args.input, args.output.clone());
    let outcome = container.remux_interactor().remux(&request);

    let summary = match &outcome {
        Ok(report) => RemuxSummary::success(report),
        Err(e) => RemuxSummary::failure(&args.output, e),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize remux result")?;
        println!("{}", json);
    } else {
        display_summary(&summary);
    }

    match outcome {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(stage = e.stage(), code = e.code(), "Remux failed: {}", e);
            Err(anyhow::Error::new(e).context(format!("Remux failed (ret={})", summary.ret)))
        }
    }
}

/// Execute the inspect command
pub fn inspect(args: InspectArgs, config_path: Option<&Path>) -> Result<()> {
    info!("Input: {}", args.input);

    let config = resolve_config(config_path, &ConfigOverrides::default())
        .context("Failed to resolve configuration")?;
    let container = DefaultAppContainer::new(config).context("Failed to initialize libav")?;

    let report = container
        .inspect_interactor()
        .inspect(&args.input)
        .with_context(|| format!("Failed to inspect {}", args.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize inspect report")?;
        println!("{}", json);
    } else {
        println!("{}", render_inspect_report(&report));
    }
    Ok(())
}

fn file_size(path: &str) -> u64 {
    std::fs::metadata(path).map(|metadata| metadata.len()).unwrap_or(0)
}

fn display_summary(summary: &RemuxSummary) {
    match (&summary.policy, &summary.error) {
        (Some(policy), _) => {
            println!("Remux completed: {}", summary.output);
            println!("  Policy: {} (attempt {})", policy, summary.attempts);
            println!("  Streams: {}", summary.streams);
            println!(
                "  Packets: {} written, {} skipped",
                summary.packets_written, summary.packets_skipped
            );
            println!("  Size: {:.2} MB", summary.bytes as f64 / 1_048_576.0);
        }
        (None, error) => {
            println!("Remux failed: {}", summary.output);
            println!("  ret: {}", summary.ret);
            if let Some(error) = error {
                println!("  Error: {}", error);
            }
        }
    }
}

/// Human-readable form of an [`InspectReport`]
pub fn render_inspect_report(report: &InspectReport) -> String {
    let mut output = String::new();

    output.push_str("Source Information:\n");
    output.push_str(&format!("  Locator: {}\n", report.locator));
    output.push_str(&format!("  Streams: {}\n", report.streams.len()));
    for stream in &report.streams {
        output.push_str(&format!(
            "  Stream #{}: {} {} tb={}",
            stream.index, stream.kind, stream.codec, stream.time_base
        ));
        if stream.width > 0 && stream.height > 0 {
            output.push_str(&format!(" {}x{}", stream.width, stream.height));
        }
        output.push('\n');
    }

    let probe = if report.probe.is_ready() { "ready" } else { "dimensions missing" };
    output.push_str(&format!(
        "  Probe: {} after {} packets\n",
        probe,
        report.probe.packets_read()
    ));

    output.push_str("\nMapping Policies:\n");
    for preview in &report.policies {
        if preview.no_streams {
            output.push_str(&format!("  {}: no streams\n", preview.policy));
            continue;
        }
        let pairs: Vec<String> = preview
            .carried
            .iter()
            .map(|(source, destination)| format!("{}->{}", source, destination))
            .collect();
        output.push_str(&format!("  {}: {}\n", preview.policy, pairs.join(", ")));
    }

    output
}
