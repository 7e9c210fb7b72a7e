// TOML config adapter - Reads and writes RemuxConfig as a TOML file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::model::RemuxConfig;
use crate::error::{HlsRemuxError, HlsRemuxResult};

/// libav refuses probe sizes below this
const MIN_PROBE_SIZE: u64 = 32;

/// On-disk layout: everything lives under a `[remux]` table
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    remux: RemuxConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// File looked up in the working directory when no path is given
    pub fn default_path() -> PathBuf {
        PathBuf::from("hls_remux.toml")
    }

    /// Parse a config document; missing keys keep their defaults
    pub fn parse(content: &str) -> HlsRemuxResult<RemuxConfig> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| HlsRemuxError::ConfigError {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        Ok(file.remux)
    }

    pub fn load(path: &Path) -> HlsRemuxResult<RemuxConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| HlsRemuxError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn render(config: &RemuxConfig) -> HlsRemuxResult<String> {
        let file = ConfigFile {
            remux: config.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| HlsRemuxError::ConfigError {
            message: format!("Failed to serialize config: {}", e),
        })
    }

    pub fn save(config: &RemuxConfig, path: &Path) -> HlsRemuxResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, Self::render(config)?)?;
        Ok(())
    }

    /// Reject values libav would refuse or that make no sense
    pub fn validate(config: &RemuxConfig) -> HlsRemuxResult<()> {
        let fail = |message: &str| -> HlsRemuxResult<()> {
            Err(HlsRemuxError::ConfigError {
                message: message.to_string(),
            })
        };

        if config.output.format.trim().is_empty() {
            return fail("output.format cannot be empty");
        }
        if matches!(&config.input.format, Some(format) if format.trim().is_empty()) {
            return fail("input.format cannot be empty when set");
        }
        if config.input.protocol_whitelist.trim().is_empty() {
            return fail("input.protocol_whitelist cannot be empty");
        }
        if config.input.probe_size < MIN_PROBE_SIZE {
            return fail("input.probe_size must be at least 32 bytes");
        }
        if config.input.analyze_duration_us == 0 {
            return fail("input.analyze_duration_us must be positive");
        }
        Ok(())
    }
}
