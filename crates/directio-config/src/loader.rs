//! Configuration loader with multi-source merging

use crate::DirectIoConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

const PROJECT_CONFIG: &str = "directio.toml";
const LOCAL_CONFIG: &str = "directio.local.toml";

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "DIO".to_string(),
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "DIO")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/directio/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<DirectIoConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = DirectIoConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/directio/config.toml)
        if self.user_config
            && let Some(user_file) = user_config_file()
            && user_file.exists()
        {
            builder = builder.add_source(
                config::File::from(user_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Project config (directio.toml)
        let project_config_file = self.project_dir.join(PROJECT_CONFIG);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (directio.local.toml, gitignored)
        let local_config_file = self.project_dir.join(LOCAL_CONFIG);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (DIO_RUNTIME__MAX_BLOCKING_THREADS, ...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let directio_config: DirectIoConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        directio_config.validate()?;

        Ok(directio_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> DirectIoConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// ~/.config/directio/config.toml, or `None` without a home directory
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "directio", "directio")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_user_config_path() {
        // The home directory may be missing in sandboxed builds.
        if let Some(config_file) = user_config_file() {
            assert!(config_file.to_string_lossy().contains("directio"));
            assert!(config_file.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .without_user_config()
            .load()
            .expect("Failed to load config");

        assert_eq!(config, DirectIoConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[runtime]
worker_threads = 2
max_blocking_threads = 16
thread_name = "disk-worker"

[logging]
filter = "directio=trace"
"#;
        fs::write(project_dir.join(PROJECT_CONFIG), config_content)
            .expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .without_user_config()
            .load()
            .expect("Failed to load config");

        assert_eq!(config.runtime.worker_threads, Some(2));
        assert_eq!(config.runtime.max_blocking_threads, 16);
        assert_eq!(config.runtime.thread_name, "disk-worker");
        assert_eq!(config.logging.filter, "directio=trace");
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("directio.toml"),
            r#"
[runtime]
max_blocking_threads = 16
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("directio.local.toml"),
            r#"
[runtime]
max_blocking_threads = 2
"#,
        )
        .expect("Failed to write local config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .without_user_config()
            .load()
            .expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.runtime.max_blocking_threads, 2);
    }

    #[test]
    fn test_invalid_values_fail_to_load() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("directio.toml"),
            r#"
[runtime]
max_blocking_threads = 0
"#,
        )
        .expect("Failed to write project config");

        let result = ConfigLoader::new()
            .with_project_dir(project_dir)
            .without_user_config()
            .load();
        assert!(result.is_err());
        assert_eq!(
            ConfigLoader::new()
                .with_project_dir(project_dir)
                .without_user_config()
                .load_or_default(),
            DirectIoConfig::default()
        );
    }

    // Environment variables are not exercised here: the process environment
    // is shared across parallel tests. In actual usage:
    //
    // DIO_RUNTIME__MAX_BLOCKING_THREADS=8
    // DIO_LOGGING__FILTER=directio=debug
}
