//! Configuration management for SparkLE GW
//!
//! Loads and validates the YAML configuration file. Every field has a
//! default, so a missing file or a partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// MIDI port configuration
///
/// Port names are matched as case-insensitive substrings of the system port
/// names.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MidiConfig {
    #[serde(default = "default_port")]
    pub input_port: String,
    #[serde(default = "default_port")]
    pub output_port: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: default_port(),
            output_port: default_port(),
        }
    }
}

/// DAW timing configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimingConfig {
    /// Upper bound when waiting for an inserted device to become addressable
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_timeout_ms: default_settle_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    ///
    /// A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !fs::try_exists(path).await.unwrap_or(false) {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        config.validate()?;
        debug!(?config, "Configuration loaded");

        Ok(config)
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.trim().is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.trim().is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }
        if self.timing.settle_timeout_ms == 0 {
            anyhow::bail!("timing.settle_timeout_ms must be greater than 0");
        }
        if self.timing.settle_timeout_ms > MAX_SETTLE_TIMEOUT_MS {
            anyhow::bail!(
                "timing.settle_timeout_ms is {} (must be at most {})",
                self.timing.settle_timeout_ms,
                MAX_SETTLE_TIMEOUT_MS
            );
        }
        Ok(())
    }
}

const MAX_SETTLE_TIMEOUT_MS: u64 = 10_000;

// Default value functions
fn default_port() -> String { "Arturia SparkLE".to_string() }
fn default_settle_timeout_ms() -> u64 { 200 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.midi.input_port, "Arturia SparkLE");
        assert_eq!(config.midi.output_port, "Arturia SparkLE");
        assert_eq!(config.timing.settle_timeout_ms, 200);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let file = write_config("midi:\n  input_port: \"SparkLE In\"\n");
        let config = AppConfig::load(file.path()).await.unwrap();
        assert_eq!(config.midi.input_port, "SparkLE In");
        assert_eq!(config.midi.output_port, "Arturia SparkLE");
        assert_eq!(config.timing.settle_timeout_ms, 200);
    }

    #[tokio::test]
    async fn test_load_full_file() {
        let file = write_config(
            "midi:\n  input_port: a\n  output_port: b\ntiming:\n  settle_timeout_ms: 350\n",
        );
        let config = AppConfig::load(file.path()).await.unwrap();
        assert_eq!(config.midi.output_port, "b");
        assert_eq!(config.timing.settle_timeout_ms, 350);
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("sparkle.yaml")).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_values_rejected() {
        let file = write_config("midi:\n  input_port: \"\"\n");
        assert!(AppConfig::load(file.path()).await.is_err());

        let file = write_config("timing:\n  settle_timeout_ms: 0\n");
        assert!(AppConfig::load(file.path()).await.is_err());

        let file = write_config("midi: [not, a, map]\n");
        assert!(AppConfig::load(file.path()).await.is_err());
    }
}
