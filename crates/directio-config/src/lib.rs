//! Configuration management for directio
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (DIO_* prefix, highest precedence)
//! 2. directio.local.toml (gitignored, local overrides)
//! 3. directio.toml (git-tracked, project config)
//! 4. ~/.config/directio/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main directio configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectIoConfig {
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

/// Worker runtime that executes blocking device calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Async worker threads; `None` uses one per core.
    pub worker_threads: Option<usize>,
    /// Upper bound on threads running device calls concurrently.
    pub max_blocking_threads: usize,
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_blocking_threads: 512,
            thread_name: "directio-worker".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

impl DirectIoConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML file, without merging other sources
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.max_blocking_threads == 0 {
            return Err(ConfigError::ValidationError(
                "runtime.max_blocking_threads must be positive".to_string(),
            ));
        }
        if self.runtime.worker_threads == Some(0) {
            return Err(ConfigError::ValidationError(
                "runtime.worker_threads must be positive".to_string(),
            ));
        }
        if self.runtime.thread_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "runtime.thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a configuration for tests and debugging
    pub fn development() -> Self {
        Self {
            runtime: RuntimeConfig {
                worker_threads: Some(1),
                max_blocking_threads: 4,
                ..Default::default()
            },
            logging: LoggingConfig {
                filter: "directio=debug".to_string(),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DirectIoConfig::default();
        assert_eq!(config.runtime.worker_threads, None);
        assert_eq!(config.runtime.max_blocking_threads, 512);
        assert_eq!(config.runtime.thread_name, "directio-worker");
        assert_eq!(config.logging.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = DirectIoConfig::development();
        assert_eq!(config.runtime.worker_threads, Some(1));
        assert_eq!(config.logging.filter, "directio=debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_threads() {
        let mut config = DirectIoConfig::default();
        config.runtime.max_blocking_threads = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = DirectIoConfig::default();
        config.runtime.worker_threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("directio.toml");
        fs::write(
            &path,
            r#"
[runtime]
max_blocking_threads = 8

[logging]
ansi = false
"#,
        )
        .expect("Failed to write config");

        let config = DirectIoConfig::from_file(&path).expect("Failed to parse config");
        assert_eq!(config.runtime.max_blocking_threads, 8);
        assert_eq!(config.runtime.thread_name, "directio-worker");
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            DirectIoConfig::from_file(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let broken = temp_dir.path().join("broken.toml");
        fs::write(&broken, "[runtime\n").expect("Failed to write config");
        assert!(matches!(
            DirectIoConfig::from_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
