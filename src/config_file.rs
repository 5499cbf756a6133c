//! Configuration file handling for osximg
//!
//! The file is optional. It only overrides which programs are run and the `dd` block size; a
//! missing file leaves the built-in defaults in place.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to parse YAML config file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON config file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Invalid config: {0}")]
    Validation(String),
}

static BLOCK_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[0-9]+[kmg]?$").expect("block size pattern is valid"));

/// Programs and parameters used to talk to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub diskutil: String,
    pub plutil: String,
    pub dd: String,
    pub pv: String,
    pub sudo: String,
    pub shell: String,
    pub block_size: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            diskutil: "diskutil".to_string(),
            plutil: "plutil".to_string(),
            dd: "dd".to_string(),
            pv: "pv".to_string(),
            sudo: "sudo".to_string(),
            shell: "bash".to_string(),
            block_size: "1m".to_string(),
        }
    }
}

/// Root configuration structure as written on disk
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub osximg_version: Option<String>,
    pub diskutil: Option<String>,
    pub plutil: Option<String>,
    pub dd: Option<String>,
    pub pv: Option<String>,
    pub sudo: Option<String>,
    pub shell: Option<String>,
    pub block_size: Option<String>,
}

impl TryFrom<Config> for ToolConfig {
    type Error = ConfigError;

    fn try_from(config: Config) -> Result<Self, Self::Error> {
        let defaults = ToolConfig::default();
        let tools = ToolConfig {
            diskutil: config.diskutil.unwrap_or(defaults.diskutil),
            plutil: config.plutil.unwrap_or(defaults.plutil),
            dd: config.dd.unwrap_or(defaults.dd),
            pv: config.pv.unwrap_or(defaults.pv),
            sudo: config.sudo.unwrap_or(defaults.sudo),
            shell: config.shell.unwrap_or(defaults.shell),
            block_size: config.block_size.unwrap_or(defaults.block_size),
        };
        tools.validate()?;
        Ok(tools)
    }
}

impl ToolConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let programs = [
            ("diskutil", &self.diskutil),
            ("plutil", &self.plutil),
            ("dd", &self.dd),
            ("pv", &self.pv),
            ("sudo", &self.sudo),
            ("shell", &self.shell),
        ];
        for (key, value) in programs {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("`{key}` must not be empty")));
            }
        }
        if !BLOCK_SIZE.is_match(&self.block_size) {
            return Err(ConfigError::Validation(format!(
                "`block_size` must be a number with an optional k/m/g suffix, got '{}'",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// List of supported configuration file names
const FILENAMES: [&str; 3] = [".osximg.json", ".osximg.yaml", ".osximg.yml"];

impl Config {
    /// Loads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(file)
            .map_err(|_| ConfigError::ConfigNotFound(file.to_path_buf()))?;
        let config: Config = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        Ok(config)
    }

    /// Searches for a configuration file in `start` and its parents.
    #[must_use]
    pub fn find_config(start: &Path) -> Option<PathBuf> {
        let mut path = start.to_path_buf();
        debug!("Searching for config file in {}", start.display());
        loop {
            for file in &FILENAMES {
                let config_path = path.join(file);
                if config_path.exists() {
                    info!("Found config file: {}", config_path.display());
                    return Some(config_path);
                }
            }
            if !path.pop() {
                return None;
            }
        }
    }
}

/// Load the tool configuration from `config_file`, or from an auto-detected file, or defaults.
///
/// # Errors
///
/// Returns `ConfigError` if an explicit file does not exist, a file cannot be parsed, or its values
/// are invalid.
pub fn load_config(config_file: Option<&Path>) -> Result<ToolConfig, ConfigError> {
    let config_path = match config_file {
        Some(file) => {
            if !file.exists() {
                return Err(ConfigError::ConfigNotFound(file.to_path_buf()));
            }
            Some(file.to_path_buf())
        }
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
            Config::find_config(&cwd)
        }
    };
    let Some(config_path) = config_path else {
        debug!("No config file found, using defaults");
        return Ok(ToolConfig::default());
    };

    let parsed = Config::from_file(&config_path)?;
    if let Some(version) = &parsed.osximg_version {
        validate_version(version);
    }
    parsed.try_into()
}

/// Warn if the config's `osximg_version` doesn't match the binary version
fn validate_version(config_version: &str) {
    let binary_version = env!("CARGO_PKG_VERSION");
    if config_version.trim_start_matches('v') != binary_version {
        warn!(
            "Config osximg_version '{config_version}' differs from binary version '{binary_version}'"
        );
    }
}
