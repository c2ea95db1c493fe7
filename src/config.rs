use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{GdpError, Result};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gdp.toml";

/// File name looked up in the user config directory.
pub const USER_CONFIG_FILE: &str = ".gdp.toml";

/// Represents the complete configuration for gdp.
///
/// Every field has a default, so an empty file (or no file at all) is valid.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Branch deploy tags may be cut from.
    #[serde(default = "default_release_branch")]
    pub release_branch: String,

    /// Remote that tags are pushed to and checked against.
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub safety_window: SafetyWindow,

    #[serde(default)]
    pub publish: PublishConfig,
}

fn default_release_branch() -> String {
    "master".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            release_branch: default_release_branch(),
            remote: default_remote(),
            safety_window: SafetyWindow::default(),
            publish: PublishConfig::default(),
        }
    }
}

/// Hours of the day during which deploys run without confirmation.
///
/// Half-open: `start <= hour < end` is inside the window.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct SafetyWindow {
    pub start: u32,
    pub end: u32,
}

impl SafetyWindow {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

impl Default for SafetyWindow {
    fn default() -> Self {
        SafetyWindow { start: 9, end: 19 }
    }
}

/// Configuration of the release publication step.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishConfig {
    #[serde(default)]
    pub tool: ReleaseTool,
}

/// External tool that creates the hosted release.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseTool {
    #[default]
    Hub,
    Gh,
}

impl ReleaseTool {
    /// Executable name.
    pub fn program(&self) -> &'static str {
        match self {
            ReleaseTool::Hub => "hub",
            ReleaseTool::Gh => "gh",
        }
    }
}

impl fmt::Display for ReleaseTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl Config {
    /// Checks values serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let window = self.safety_window;
        if window.start >= window.end || window.end > 24 {
            return Err(GdpError::config(format!(
                "safety window {}-{} must satisfy start < end <= 24",
                window.start, window.end
            )));
        }

        if self.release_branch.trim().is_empty() {
            return Err(GdpError::config("release_branch must not be empty"));
        }

        if self.remote.trim().is_empty() {
            return Err(GdpError::config("remote must not be empty"));
        }

        Ok(())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gdp.toml` in current directory
/// 3. `.gdp.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        read(Path::new(path))?
    } else if Path::new(LOCAL_CONFIG_FILE).exists() {
        read(Path::new(LOCAL_CONFIG_FILE))?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(USER_CONFIG_FILE);
        if config_path.exists() {
            read(&config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config = toml::from_str(&config_str).map_err(|e| GdpError::config(e.to_string()))?;
    config.validate()?;
    log::debug!("loaded configuration: {:?}", config);
    Ok(config)
}

fn read(path: &Path) -> Result<String> {
    log::debug!("reading configuration from {}", path.display());
    fs::read_to_string(path)
        .map_err(|e| GdpError::config(format!("cannot read {}: {}", path.display(), e)))
}
