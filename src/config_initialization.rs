//! Configuration resolution for the CLI: defaults, then file, then flags

use std::path::Path;

use tracing::{debug, info};

use crate::adapters::TomlConfigAdapter;
use crate::domain::model::RemuxConfig;
use crate::error::HlsRemuxResult;

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub strict_dimensions: bool,
    pub dimension_probe_packets: Option<usize>,
}

/// Resolve the run configuration.
///
/// An explicit `path` must exist. Without one, `hls_remux.toml` in the
/// working directory is used when present.
pub fn resolve_config(path: Option<&Path>, overrides: &ConfigOverrides) -> HlsRemuxResult<RemuxConfig> {
    let mut config = match path {
        Some(path) => TomlConfigAdapter::load(path)?,
        None => {
            let fallback = TomlConfigAdapter::default_path();
            if fallback.exists() {
                TomlConfigAdapter::load(&fallback)?
            } else {
                debug!("No config file, using defaults");
                RemuxConfig::default()
            }
        }
    };

    if overrides.strict_dimensions {
        info!("CLI override: strict_dimensions = true");
        config.strict_dimensions = true;
    }
    if let Some(packets) = overrides.dimension_probe_packets {
        info!("CLI override: dimension_probe_packets = {}", packets);
        config.dimension_probe_packets = packets;
    }

    TomlConfigAdapter::validate(&config)?;
    Ok(config)
}
