//! User configuration in ~/.pv-sizing/config.toml

use anyhow::{anyhow, Context, Result};
use pv_core::DesignPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PvConfig {
    /// Design limits and safety factors
    #[serde(default)]
    pub policy: DesignPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| anyhow!("invalid log level '{}' in config", self.level))
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))
        .map(|h| h.join(".pv-sizing").join("config.toml"))
}

/// Load `path`, or the default location when `None`. A missing file at the
/// default location yields defaults; an explicit path must exist.
pub fn load_config(path: Option<&Path>) -> Result<PvConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Ok(path) if path.exists() => path,
            _ => return Ok(PvConfig::default()),
        },
    };
    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("reading config '{}'", config_path.display()))?;
    let config: PvConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing config '{}'", config_path.display()))?;
    config
        .policy
        .validate()
        .with_context(|| format!("validating policy in '{}'", config_path.display()))?;
    config
        .logging
        .level()
        .with_context(|| format!("validating logging in '{}'", config_path.display()))?;
    Ok(config)
}
