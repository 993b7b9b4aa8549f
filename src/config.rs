//! Configuration Module
//!
//! Flat string-keyed backend configuration and the typed per-backend
//! structures parsed from it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;

use crate::error::{CacheError, Result};

// == Defaults ==
/// Seconds between memory sweeps when `interval` is not set.
pub const DEFAULT_SWEEP_INTERVAL: i64 = 60;
pub const DEFAULT_CACHE_PATH: &str = "cache";
pub const DEFAULT_FILE_SUFFIX: &str = ".bin";
pub const DEFAULT_DIRECTORY_LEVEL: i64 = 2;
pub const DEFAULT_EMBED_EXPIRY: i64 = 0;

// == Backend Config ==
/// Flat mapping of string keys to string values handed to `Cache::start`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    values: HashMap<String, String>,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses a JSON object such as `{"interval": 5}` or
    /// `{"CachePath": "/var/cache/app", "DirectoryLevel": "1"}`.
    ///
    /// Strings, numbers and booleans are accepted as values; nested
    /// objects and arrays are rejected.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: Value = serde_json::from_str(raw).map_err(|e| {
            CacheError::Validation(format!("config is not valid JSON ({}): {}", e, raw))
        })?;

        let Value::Object(map) = parsed else {
            return Err(CacheError::Validation(format!(
                "config must be a JSON object: {}",
                raw
            )));
        };

        let mut config = Self::new();
        for (key, value) in map {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(CacheError::Validation(format!(
                        "config value for {} must be a scalar, got {}",
                        key, other
                    )))
                }
            };
            config.values.insert(key, value);
        }
        Ok(config)
    }

    /// Parses `key` as an integer, falling back to `default` when absent.
    fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => parse_int(key, raw),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BackendConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn parse_int(key: &str, raw: &str) -> Result<i64> {
    i64::from_str(raw.trim()).map_err(|_| {
        CacheError::Validation(format!("{} must be an integer, got {:?}", key, raw))
    })
}

// == Memory Config ==
/// Typed configuration for the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Seconds between sweeps; values below 1 disable the sweep
    pub interval_secs: i64,
}

impl MemoryConfig {
    pub const INTERVAL: &'static str = "interval";

    pub fn from_backend_config(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            interval_secs: config.int_or(Self::INTERVAL, DEFAULT_SWEEP_INTERVAL)?,
        })
    }

    /// Sweep period, or `None` when the sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        if self.interval_secs < 1 {
            None
        } else {
            Some(Duration::from_secs(self.interval_secs as u64))
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

// == Directory Level ==
/// How many digest-derived subdirectories sit between the root and a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLevel {
    Flat,
    One,
    Two,
}

impl DirectoryLevel {
    pub fn depth(self) -> usize {
        match self {
            DirectoryLevel::Flat => 0,
            DirectoryLevel::One => 1,
            DirectoryLevel::Two => 2,
        }
    }
}

impl TryFrom<i64> for DirectoryLevel {
    type Error = CacheError;

    fn try_from(level: i64) -> Result<Self> {
        match level {
            0 => Ok(DirectoryLevel::Flat),
            1 => Ok(DirectoryLevel::One),
            2 => Ok(DirectoryLevel::Two),
            other => Err(CacheError::Validation(format!(
                "{} must be 0, 1 or 2, got {}",
                FileConfig::DIRECTORY_LEVEL,
                other
            ))),
        }
    }
}

// == File Config ==
/// Typed configuration for the file backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    /// Root directory of the cache tree
    pub cache_path: PathBuf,
    /// Suffix appended to every entry file name
    pub file_suffix: String,
    pub directory_level: DirectoryLevel,
    /// Expiry applied to `Ttl::Default` puts; zero means the ten-year horizon
    pub embed_expiry: Duration,
}

impl FileConfig {
    pub const CACHE_PATH: &'static str = "CachePath";
    pub const FILE_SUFFIX: &'static str = "FileSuffix";
    pub const DIRECTORY_LEVEL: &'static str = "DirectoryLevel";
    pub const EMBED_EXPIRY: &'static str = "EmbedExpiry";

    pub fn from_backend_config(config: &BackendConfig) -> Result<Self> {
        let directory_level =
            DirectoryLevel::try_from(config.int_or(Self::DIRECTORY_LEVEL, DEFAULT_DIRECTORY_LEVEL)?)?;

        let embed_expiry = config.int_or(Self::EMBED_EXPIRY, DEFAULT_EMBED_EXPIRY)?;
        if embed_expiry < 0 {
            return Err(CacheError::Validation(format!(
                "{} must not be negative, got {}",
                Self::EMBED_EXPIRY,
                embed_expiry
            )));
        }

        Ok(Self {
            cache_path: PathBuf::from(config.get(Self::CACHE_PATH).unwrap_or(DEFAULT_CACHE_PATH)),
            file_suffix: config
                .get(Self::FILE_SUFFIX)
                .unwrap_or(DEFAULT_FILE_SUFFIX)
                .to_string(),
            directory_level,
            embed_expiry: Duration::from_secs(embed_expiry as u64),
        })
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            directory_level: DirectoryLevel::Two,
            embed_expiry: Duration::ZERO,
        }
    }
}

// == App Config ==
/// Binary configuration: which backend to build and what to hand it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Registered backend name
    pub backend: String,
    /// Raw backend configuration
    pub backend_config: BackendConfig,
}

impl AppConfig {
    /// Builds the configuration from a backend name and the JSON object
    /// meant for it. A blank JSON string means an empty configuration.
    pub fn new(backend: impl Into<String>, raw_config: &str) -> Result<Self> {
        let backend_config = if raw_config.trim().is_empty() {
            BackendConfig::new()
        } else {
            BackendConfig::from_json(raw_config)?
        };
        Ok(Self {
            backend: backend.into(),
            backend_config,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            backend_config: BackendConfig::new(),
        }
    }
}
