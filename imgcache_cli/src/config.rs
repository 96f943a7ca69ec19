use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use imgcache_core::{AssetRegistry, PlatformProfile, ProfileKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "IMGCACHE_";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Bundled assets: semantic key to file path
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

/// Where the snapshot lives
#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub profile: ProfileKind,
    pub storage: StorageKind,
    pub key_prefix: String,

    /// Overrides the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Overrides the profile's remote batch size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Directory relative asset paths are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            profile: ProfileKind::Standard,
            storage: StorageKind::File,
            key_prefix: imgcache_core::storage::snapshot::DEFAULT_PREFIX.to_string(),
            storage_dir: None,
            batch_size: None,
            assets_dir: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: concat!("imgcache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

impl AppConfig {
    /// Platform profile with configured overrides applied
    pub fn profile(&self) -> PlatformProfile {
        let mut profile = PlatformProfile::for_kind(self.cache.profile);
        if let Some(batch_size) = self.cache.batch_size {
            profile.remote_batch_size = batch_size;
        }
        profile
    }

    /// Directory the file backend writes into
    pub fn storage_dir(&self) -> PathBuf {
        self.cache
            .storage_dir
            .clone()
            .unwrap_or_else(paths::get_storage_dir)
    }

    /// Registry built from the `[assets]` table
    pub fn registry(&self) -> AssetRegistry {
        self.assets
            .iter()
            .map(|(key, path)| (key.clone(), path.clone()))
            .collect()
    }
}

/// Key-level configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Invalid key path: {0}")]
    InvalidKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    fn invalid_value(key: &str, reason: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
                }
                _ => return Err(ConfigError::InvalidKey(key.to_string()).into()),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation) and write the file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed = Self::parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path).with_context(|| {
                format!("Failed to read {}", self.config_path.display())
            })?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(ConfigError::InvalidKey(key.to_string()).into());
        };

        let mut current = &mut config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                return Err(ConfigError::InvalidKey(key.to_string()).into());
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        match current {
            toml::Value::Table(table) => {
                table.insert(last.to_string(), parsed);
            }
            _ => return Err(ConfigError::InvalidKey(key.to_string()).into()),
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;

        // Reject a file the loader would fail on
        self.load()
            .with_context(|| format!("'{key}' would make the configuration invalid"))?;
        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {}
        }
    }

    /// Validate `value` for `key` and convert it to its TOML type
    fn parse_config_value(key: &str, value: &str) -> Result<toml::Value, ConfigError> {
        let positive = |reason: &str| -> Result<toml::Value, ConfigError> {
            match value.parse::<i64>() {
                Ok(n) if n > 0 => Ok(toml::Value::Integer(n)),
                _ => Err(ConfigError::invalid_value(key, reason)),
            }
        };
        let boolean = || -> Result<toml::Value, ConfigError> {
            value
                .parse::<bool>()
                .map(toml::Value::Boolean)
                .map_err(|_| ConfigError::invalid_value(key, "must be 'true' or 'false'"))
        };
        let one_of = |allowed: &[&str]| -> Result<toml::Value, ConfigError> {
            if allowed.contains(&value) {
                Ok(toml::Value::String(value.to_string()))
            } else {
                Err(ConfigError::invalid_value(
                    key,
                    &format!("must be one of: {}", allowed.join(", ")),
                ))
            }
        };

        match key {
            "cache.profile" => one_of(&["standard", "constrained"]),
            "cache.storage" => one_of(&["file", "memory"]),
            "cache.batch_size" => positive("must be a positive integer"),
            "cache.key_prefix" if value.is_empty() => {
                Err(ConfigError::invalid_value(key, "must not be empty"))
            }
            "network.timeout_seconds" => positive("must be a positive integer"),
            "output.default_format" => one_of(&["text", "json"]),
            "output.color_enabled" | "output.progress_enabled" => boolean(),
            k if k.starts_with("assets.") && k.len() > "assets.".len() => {
                Ok(toml::Value::String(value.to_string()))
            }
            "cache.key_prefix"
            | "cache.storage_dir"
            | "cache.assets_dir"
            | "network.user_agent" => Ok(toml::Value::String(value.to_string())),
            _ => Err(ConfigError::KeyNotFound(key.to_string())),
        }
    }
}

/// Load the configuration from the default location
pub fn load_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}
