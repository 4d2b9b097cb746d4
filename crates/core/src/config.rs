//! Configuration management
//!
//! Settings live in `config.toml` inside the rstore config directory
//! (`$RSTORE_CONFIG_DIR`, or the platform config dir joined with `rstore`).
//! A missing file means defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "RSTORE_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Retry policy applied to every remote-facing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
        }
    }
}

/// How the external transfer tool is invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsyncConfig {
    /// Program name or path
    pub program: String,
    /// Flags placed before the source and destination arguments
    pub options: Vec<String>,
}

impl Default for RsyncConfig {
    fn default() -> Self {
        Self {
            program: "rsync".to_string(),
            options: vec!["-av".to_string()],
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetryConfig,
    pub rsync: RsyncConfig,
}

/// Loads and saves [`Config`] from the config directory
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Use `$RSTORE_CONFIG_DIR` or the platform default directory
    pub fn new() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(Self::with_dir(PathBuf::from(dir)));
        }

        let base = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;
        Ok(Self::with_dir(base.join("rstore")))
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Load the config, falling back to defaults when the file is absent
    pub fn load(&self) -> Result<Config> {
        let path = self.config_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content =
            toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }
}
