// Tracing log adapter - Subscriber setup and progress events as structured logs

use std::fmt;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::domain::model::RemuxEvent;
use crate::error::{HlsRemuxError, HlsRemuxResult};
use crate::ports::ProgressPort;

/// Verbosity accepted by `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(level: &str) -> HlsRemuxResult<Self> {
        match level.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(HlsRemuxError::ConfigError {
                message: format!("Unknown log level: {}", other),
            }),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. A second call is a no-op.
pub fn init_logging(level: LogLevel, json: bool) -> HlsRemuxResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level.to_string()).map_err(|e| HlsRemuxError::LoggingError {
            message: e.to_string(),
        })?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = installed {
        // Already installed by an earlier call or by a test harness
        debug!("Logging already initialized: {}", e);
    }
    Ok(())
}

/// [`ProgressPort`] that reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressAdapter;

impl TracingProgressAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressPort for TracingProgressAdapter {
    fn on_event(&self, event: &RemuxEvent) {
        match event {
            RemuxEvent::Started {
                attempt,
                policy,
                output,
            } => info!(state = "started", attempt, policy = %policy, output = %output, "Remux started"),
            RemuxEvent::Running { packets, bytes } => {
                debug!(state = "running", packets, bytes, "Remux progress")
            }
            RemuxEvent::Done {
                output,
                policy,
                bytes,
            } => info!(state = "done", policy = %policy, output = %output, bytes, "Remux finished"),
            RemuxEvent::Failed {
                attempt,
                policy,
                stage,
                code,
            } => warn!(state = "error", attempt, policy = %policy, stage = %stage, code, "Remux attempt failed"),
        }
    }
}
