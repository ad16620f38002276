//! Configuration loader

use std::path::Path;

use tracing::debug;

use kvgate_utils::{config_file, logging::validate_filter, KvgateError, Result};

use super::{AppConfig, DEFAULT_CONFIG_TOML};

/// Smallest accepted `max_line_length`
const MIN_LINE_LENGTH: usize = 16;
/// Largest accepted `max_line_length`
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    ///
    /// Falls back to the built-in defaults when no file exists there.
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::parse(DEFAULT_CONFIG_TOML, Path::new("<defaults>"))
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(KvgateError::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| KvgateError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| KvgateError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.server.bind_address.trim().is_empty() {
            return Err(KvgateError::config("bind_address must not be empty"));
        }

        let len = config.server.max_line_length;
        if !(MIN_LINE_LENGTH..=MAX_LINE_LENGTH).contains(&len) {
            return Err(KvgateError::config(format!(
                "max_line_length must be between {} and {}",
                MIN_LINE_LENGTH, MAX_LINE_LENGTH
            )));
        }

        validate_filter(&config.logging.filter)?;

        Ok(())
    }

    /// Load from `path` (or the default location) and validate
    pub fn load_and_validate(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}
