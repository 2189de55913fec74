//! Configuration loader with multi-source merging

use crate::{HaliteConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "HALITE".to_string(),
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "HALITE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<HaliteConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = HaliteConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/halite/config.toml)
        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 3. Project config (halite.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (halite.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (HALITE_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let halite_config: HaliteConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(halite_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> HaliteConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.sealing.key_name, "halite-system-key");
        assert_eq!(config.sealing.master_cache_ttl_secs, 300);
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        // Write project config
        let config_content = r#"
[sealing]
key_name = "staging-master"
key_version = 3
unseal_timeout_secs = 5

[store]
max_field_bytes = 1024
"#;
        fs::write(project_dir.join("halite.toml"), config_content)
            .expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.sealing.key_name, "staging-master");
        assert_eq!(config.sealing.key_version, 3);
        assert_eq!(config.sealing.unseal_timeout_secs, 5);
        assert_eq!(config.store.max_field_bytes, 1024);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("halite.toml"),
            r#"
[sealing]
key_name = "project-master"
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("halite.local.toml"),
            r#"
[sealing]
key_name = "local-master"
"#,
        )
        .expect("Failed to write local config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.sealing.key_name, "local-master");
    }

    #[test]
    fn test_load_or_default_on_empty_dir() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load_or_default();
        assert_eq!(config.store.max_field_bytes, 64 * 1024);
    }
}
