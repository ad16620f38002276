//! Path utilities for kvgate
//!
//! Handles XDG Base Directory specification compliance for config and
//! state directories.

use std::path::PathBuf;
use directories::ProjectDirs;

/// Application identifier for XDG directories
const APP_NAME: &str = "kvgate";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/kvgate` or `~/.config/kvgate`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/kvgate/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory
///
/// Location: `$XDG_STATE_HOME/kvgate` or `~/.local/state/kvgate`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/kvgate/log` or `~/.local/state/kvgate/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        let path = config_dir();
        assert!(path.to_string_lossy().contains("kvgate"));
    }

    #[test]
    fn test_config_file_is_toml() {
        let path = config_file();
        assert!(path.to_string_lossy().ends_with(".toml"));
    }

    #[test]
    fn test_log_dir_under_state_dir() {
        assert!(log_dir().starts_with(state_dir()));
    }
}
