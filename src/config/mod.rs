//! Configuration management for RemoteViewport
//!
//! This module handles application configuration including:
//! - Loading and saving configuration files
//! - Managing the configuration directory
//! - Providing sensible defaults
//! - Configuration validation
//!
//! The binary takes no CLI flags; the compiled-in defaults below are the
//! whole surface, optionally overridden by the TOML config file.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// Constants for configuration (avoiding magic numbers)
const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5930;
const DEFAULT_DISPLAY_WIDTH: u32 = 1400;
const DEFAULT_DISPLAY_HEIGHT: u32 = 800;
const DEFAULT_RESIZE_INTERVAL_SECS: u64 = 2;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    pub connection: ConnectionConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Remote host to connect to
    pub host: String,

    /// Remote port to connect to
    pub port: u16,

    /// Optional session password
    ///
    /// Held in memory only as long as the session needs it; scrubbed on
    /// authentication failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Display-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Default display width applied by the automatic resize timer
    pub default_width: u32,

    /// Default display height applied by the automatic resize timer
    pub default_height: u32,

    /// Interval between automatic resize attempts, in seconds
    pub resize_interval_secs: u64,

    /// Enable the automatic resize timer
    pub auto_resize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_width: DEFAULT_DISPLAY_WIDTH,
            default_height: DEFAULT_DISPLAY_HEIGHT,
            resize_interval_secs: DEFAULT_RESIZE_INTERVAL_SECS,
            auto_resize: true,
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager using the platform config directory
    ///
    /// # Errors
    ///
    /// Returns error if the project directory cannot be determined
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::get_config_directory()?;
        Ok(Self::with_config_directory(config_dir))
    }

    /// Creates a ConfigManager rooted at an explicit directory
    ///
    /// Used by tests and embedders that manage their own paths.
    pub fn with_config_directory(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        Self {
            config_dir,
            config_file,
        }
    }

    /// Gets the configuration directory path
    fn get_config_directory() -> ConfigResult<PathBuf> {
        ProjectDirs::from("com", "remoteviewport", "RemoteViewport")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| {
                ConfigError::DirectoryNotFound(
                    "Could not determine configuration directory".to_string(),
                )
            })
    }

    /// Ensures the configuration directory exists
    fn ensure_config_directory(&self) -> ConfigResult<()> {
        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir).map_err(|e| {
                ConfigError::DirectoryCreationFailed(format!(
                    "Failed to create config directory at {:?}: {}",
                    self.config_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Loads configuration from file, or creates the default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns error if configuration cannot be loaded or created
    pub fn load_or_create_default(&self) -> ConfigResult<Config> {
        self.ensure_config_directory()?;

        if self.config_file.exists() {
            self.load()
        } else {
            let config = Config::default();
            self.save(&config)?;
            Ok(config)
        }
    }

    /// Loads configuration from file
    fn load(&self) -> ConfigResult<Config> {
        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to parse config file: {}", e)))?;

        self.validate(&config)?;

        Ok(config)
    }

    /// Saves configuration to file
    ///
    /// # Errors
    ///
    /// Returns error if configuration cannot be saved
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.ensure_config_directory()?;
        self.validate(config)?;

        let content = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        fs::write(&self.config_file, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validates configuration values
    fn validate(&self, config: &Config) -> ConfigResult<()> {
        if config.connection.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "Host must not be empty".to_string(),
            ));
        }

        if config.connection.port == 0 {
            return Err(ConfigError::InvalidValue(
                "Port must be non-zero".to_string(),
            ));
        }

        if config.display.default_width == 0 || config.display.default_height == 0 {
            return Err(ConfigError::InvalidValue(
                "Display dimensions must be non-zero".to_string(),
            ));
        }

        if config.display.auto_resize && config.display.resize_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "Resize interval must be non-zero when auto resize is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Gets the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_file
    }

    /// Gets the configuration directory path
    pub fn config_directory(&self) -> &PathBuf {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 5930);
        assert_eq!(config.display.default_width, 1400);
        assert_eq!(config.display.default_height, 800);
        assert_eq!(config.display.resize_interval_secs, 2);
        assert!(config.display.auto_resize);
        assert!(config.connection.password.is_none());
    }

    #[test]
    fn test_config_validation() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_directory(dir.path().to_path_buf());

        let mut config = Config::default();
        config.connection.port = 0;
        assert!(manager.validate(&config).is_err());

        let mut config = Config::default();
        config.display.default_width = 0;
        assert!(manager.validate(&config).is_err());

        let mut config = Config::default();
        config.display.resize_interval_secs = 0;
        assert!(manager.validate(&config).is_err());

        config.display.auto_resize = false;
        assert!(manager.validate(&config).is_ok());
    }

    #[test]
    fn test_load_or_create_default_roundtrip() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_directory(dir.path().to_path_buf());

        // First call writes the default file
        let created = manager.load_or_create_default().unwrap();
        assert!(manager.config_path().exists());

        // Second call reads it back
        let loaded = manager.load_or_create_default().unwrap();
        assert_eq!(created.connection.host, loaded.connection.host);
        assert_eq!(created.connection.port, loaded.connection.port);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.connection.password = Some("hunter2".to_string());

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.connection.port, deserialized.connection.port);
        assert_eq!(deserialized.connection.password.as_deref(), Some("hunter2"));
    }
}
