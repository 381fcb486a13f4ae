//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `--config <PATH>` on the command line
//! 2. `$RUSTED_INTEGRAL_CONFIG` environment variable
//! 3. `./rusted_integral.toml`
//! 4. Built-in defaults (every field is optional)
use anyhow::{Context, Result, bail};
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_ENV: &str = "RUSTED_INTEGRAL_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "rusted_integral.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub compute: ComputeConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// allow cross-origin requests to `/calculate`
    pub cors: bool,
}

/// Calculation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// wall-clock limit of one calculation, seconds
    pub timeout_secs: u64,
    /// symbolic engine name
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// off, error, warn, info, debug or trace
    pub level: String,
    /// also write `log_<date>_<time>.txt` in the working directory
    pub to_file: bool,
}

// --- Defaults ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            cors: false,
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            engine: "native".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            to_file: false,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level).with_context(|| {
            format!(
                "loglevel must be off, error, warn, info, debug or trace, got '{}'",
                self.level
            )
        })
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.logging.level_filter()?;
        if self.compute.timeout_secs == 0 {
            bail!("compute.timeout_secs must be positive");
        }
        Ok(())
    }
}

/// Load config from disk. Returns defaults if no config file is found.
/// An explicitly given path (flag or environment) must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match config_path(explicit) {
        Some(p) => {
            let content =
                std::fs::read_to_string(&p).with_context(|| format!("reading {}", p.display()))?;
            AppConfig::from_toml(&content).with_context(|| format!("parsing {}", p.display()))
        }
        None => Ok(AppConfig::default()),
    }
}

/// Resolve the config file path.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() { Some(local) } else { None }
}
