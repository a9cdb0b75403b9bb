//! Configuration management for hunchworks
//!
//! Handles the ~/.hunchworks/ directory structure and config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the home directory
pub const HOME_ENV: &str = "HUNCHWORKS_HOME";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
    #[serde(default)]
    pub invitations: InvitationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// Groups per page on the index
    pub page_size: u32,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationsConfig {
    /// Account recorded as the sender of every invitation batch
    pub inviter_id: i64,
}

impl Default for InvitationsConfig {
    fn default() -> Self {
        Self { inviter_id: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when HUNCHWORKS_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Returns the path to the hunchworks home directory
/// ($HUNCHWORKS_HOME, or ~/.hunchworks)
pub fn hunchworks_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".hunchworks"))
}

/// Returns paths to all hunchworks directories
#[derive(Debug, Clone)]
pub struct HunchworksPaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub db: PathBuf,
    pub db_file: PathBuf,
}

impl HunchworksPaths {
    pub fn new() -> Result<Self> {
        Ok(Self::at(hunchworks_home()?))
    }

    /// Layout rooted at an explicit directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config: root.join("config.toml"),
            db: root.join("db"),
            db_file: root.join("db/hunchworks.db"),
            root,
        }
    }

    /// Create all directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create hunchworks root")?;
        fs::create_dir_all(&self.db).context("Failed to create db directory")?;
        Ok(())
    }

    /// Check if hunchworks has been initialized
    pub fn is_initialized(&self) -> bool {
        self.config.exists() && self.db_file.exists()
    }
}

/// Load configuration from disk, falling back to defaults when the file is
/// absent
pub fn load_config(paths: &HunchworksPaths) -> Result<Config> {
    if !paths.config.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&paths.config).context("Failed to read config.toml")?;
    toml::from_str(&content).context("Failed to parse config.toml")
}

/// Save configuration to disk
pub fn save_config(paths: &HunchworksPaths, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&paths.config, content).context("Failed to write config.toml")?;
    Ok(())
}
