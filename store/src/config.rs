//! Configuration management for the benchmark history store
//!
//! Configuration is read from a TOML file, then overridden by `BENCHHIST_*`
//! environment variables, then validated.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Main configuration structure for the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Run validation rules
    pub validation: ValidationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Persistence backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    File,
    Memory,
}

/// When appended runs reach the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Persist before the append becomes visible
    WriteThrough,
    /// Mark the suite dirty and persist on `flush`
    Deferred,
}

/// Storage related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend used by `BenchmarkHistoryStore::open`
    pub backend: BackendKind,

    /// Directory holding one sub-directory per suite
    pub root_path: PathBuf,

    /// Suite file name inside each suite directory
    pub file_name: String,

    /// `repoUrl` written into newly created suites
    pub repo_url: Option<String>,

    /// Write policy
    pub write_mode: WriteMode,

    /// Write to a temporary sibling and rename into place
    pub atomic_writes: bool,
}

/// Run validation rules applied by `append_run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject runs that repeat a bench name
    pub require_unique_bench_names: bool,

    /// Reject NaN and infinite values
    pub require_finite_values: bool,

    /// Upper bound on benches in one run
    pub max_benches_per_run: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics collection
    pub enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::File,
            root_path: PathBuf::from("."),
            file_name: "data.js".to_string(),
            repo_url: None,
            write_mode: WriteMode::WriteThrough,
            atomic_writes: true,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_unique_bench_names: true,
            require_finite_values: true,
            max_benches_per_run: 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.to_string_lossy().to_string() })?;

        let config: StoreConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError { reason: e.to_string() })?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let config = StoreConfig::default().with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BENCHHIST_*` overrides read through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("BENCHHIST_ROOT") {
            self.storage.root_path = PathBuf::from(root);
        }

        if let Some(backend) = lookup("BENCHHIST_BACKEND") {
            self.storage.backend = match backend.to_lowercase().as_str() {
                "file" => BackendKind::File,
                "memory" => BackendKind::Memory,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "BENCHHIST_BACKEND".to_string(),
                        value: backend,
                    })
                }
            };
        }

        if let Some(repo_url) = lookup("BENCHHIST_REPO_URL") {
            self.storage.repo_url = Some(repo_url);
        }

        if let Some(mode) = lookup("BENCHHIST_WRITE_MODE") {
            self.storage.write_mode = match mode.to_lowercase().as_str() {
                "write_through" | "write-through" => WriteMode::WriteThrough,
                "deferred" => WriteMode::Deferred,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "BENCHHIST_WRITE_MODE".to_string(),
                        value: mode,
                    })
                }
            };
        }

        if let Some(level) = lookup("BENCHHIST_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Load configuration with fallback order: defaults -> file -> env
    pub fn load_with_fallback<P: AsRef<Path>>(config_path: Option<P>) -> ConfigResult<Self> {
        let mut config = StoreConfig::default();

        if let Some(path) = config_path {
            if path.as_ref().exists() {
                config = StoreConfig::from_file(path)?;
            }
        }

        let config = config.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.backend == BackendKind::File && self.storage.root_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.root_path".to_string(),
                value: String::new(),
            });
        }

        if self.storage.file_name.is_empty()
            || self.storage.file_name.contains('/')
            || self.storage.file_name.contains('\\')
        {
            return Err(ConfigError::InvalidValue {
                field: "storage.file_name".to_string(),
                value: self.storage.file_name.clone(),
            });
        }

        if matches!(self.storage.repo_url.as_deref(), Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "storage.repo_url".to_string(),
                value: String::new(),
            });
        }

        if self.validation.max_benches_per_run == 0 {
            return Err(ConfigError::InvalidValue {
                field: "validation.max_benches_per_run".to_string(),
                value: "0".to_string(),
            });
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("benchhist").join("config.toml"))
            .ok_or_else(|| ConfigError::ValidationFailed {
                reason: "Unable to determine config directory".to_string(),
            })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| ConfigError::ValidationFailed {
                reason: format!("Unable to create config directory: {}", parent.display()),
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationFailed { reason: e.to_string() })?;

        fs::write(path, content)
            .map_err(|_| ConfigError::PermissionDenied { path: path.to_string_lossy().to_string() })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.file_name, "data.js");
        assert_eq!(config.storage.write_mode, WriteMode::WriteThrough);
    }

    #[test]
    fn test_config_validation() {
        let mut config = StoreConfig::default();

        config.storage.file_name = "nested/data.js".to_string();
        assert!(config.validate().is_err());

        config.storage.file_name = "data.js".to_string();
        config.validation.max_benches_per_run = 0;
        assert!(config.validate().is_err());

        config.validation.max_benches_per_run = 16;
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.storage.repo_url = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = StoreConfig::default();
        config.storage.root_path = PathBuf::from("/srv/gh-pages/dev/bench");
        config.storage.repo_url = Some("https://github.com/Azure/azure-storage-fuse".to_string());
        config.storage.write_mode = WriteMode::Deferred;

        config.save_to_file(&path).unwrap();
        let loaded = StoreConfig::from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\nbackend = \"memory\"\n").unwrap();

        let loaded = StoreConfig::from_file(&path).unwrap();
        assert_eq!(loaded.storage.backend, BackendKind::Memory);
        assert_eq!(loaded.storage.file_name, "data.js");
        assert!(loaded.metrics.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BENCHHIST_ROOT", "/tmp/bench"),
            ("BENCHHIST_BACKEND", "Memory"),
            ("BENCHHIST_WRITE_MODE", "deferred"),
            ("BENCHHIST_LOG_LEVEL", "debug"),
        ]);

        let config = StoreConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.storage.root_path, PathBuf::from("/tmp/bench"));
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.storage.write_mode, WriteMode::Deferred);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_env_override() {
        let result = StoreConfig::default()
            .with_overrides(|key| (key == "BENCHHIST_BACKEND").then(|| "s3".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = StoreConfig::from_file("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
