//! Configuration file location.
//!
//! The config file is looked up in this order:
//!
//! 1. The path given on the command line (used as is, even if missing)
//! 2. `sparkle.yaml` in the current working directory
//! 3. `sparkle.yaml` in the platform config directory
//!    (`~/.config/SparkLE GW` on Linux, `%APPDATA%\SparkLE GW` on Windows)
//!
//! When none exists the working directory candidate is returned, and
//! loading it falls back to the defaults.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for the platform config directory
const APP_NAME: &str = "SparkLE GW";

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "sparkle.yaml";

/// Resolve the configuration file path for this process
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_dir = dirs::config_dir().map(|dir| dir.join(APP_NAME));
    let path = resolve_from(cli, &cwd, config_dir.as_deref());
    debug!("Config path: {}", path.display());
    path
}

fn resolve_from(cli: Option<&Path>, cwd: &Path, config_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }

    if let Some(dir) = config_dir {
        let installed = dir.join(CONFIG_FILE_NAME);
        if installed.exists() {
            return installed;
        }
    }

    local
}
