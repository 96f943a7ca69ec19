//! Centralized path management for the imgcache CLI
//!
//! Every command resolves the data, storage and configuration locations
//! through these helpers so they always agree.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DATA_DIR: &str = "imgcache";

/// Subdirectory holding the persisted snapshot records
const STORAGE_SUBDIR: &str = "storage";

/// The name of the configuration file
const CONFIG_FILE: &str = "config.toml";

/// Returns the base data directory for the application
///
/// On Unix-like systems this follows the XDG Base Directory specification
/// (`~/.local/share/imgcache`); on Windows it is `%APPDATA%/imgcache`.
/// Falls back to `.imgcache` in the current directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(".imgcache"))
}

/// Returns the directory the file storage backend writes records into
pub fn get_storage_dir() -> PathBuf {
    get_data_dir().join(STORAGE_SUBDIR)
}

/// Returns the configuration directory
///
/// Honors `XDG_CONFIG_HOME` on non-Windows platforms.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DATA_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(".imgcache"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
