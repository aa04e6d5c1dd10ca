//! Configuration loading from config.toml and environment variables.
//!
//! The config file is optional: a missing file yields the defaults, so the
//! binary runs with zero setup. Environment variables override the file,
//! which keeps deployments configurable without editing it.

use crate::core::draft::ValidationPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

const fn default_require_title() -> bool {
    true
}

/// Application configuration as parsed from config.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Whether draft validation requires a non-empty title.
    ///
    /// The canonical schema revision requires titles; deployments still
    /// reading ledgers written by the pre-title revision can relax this
    /// explicitly.
    #[serde(default = "default_require_title")]
    pub require_title: bool,

    /// Optional JSON snapshot to seed the in-process ledger with on startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    /// User whose ledger the binary subscribes to
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            require_title: default_require_title(),
            seed_path: None,
            user_id: None,
        }
    }
}

impl AppConfig {
    /// The draft acceptance rules this configuration selects.
    #[must_use]
    pub const fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            require_title: self.require_title,
        }
    }
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the main application configuration: `./config.toml` if present,
/// defaults otherwise, then environment variable overrides
/// (`BILLBUDDY_USER`, `BILLBUDDY_SEED`, `BILLBUDDY_REQUIRE_TITLE`).
pub fn load_app_configuration() -> Result<AppConfig> {
    let mut config = if Path::new("config.toml").exists() {
        load_config("config.toml")?
    } else {
        info!("No config.toml found, using defaults.");
        AppConfig::default()
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    apply_overrides(
        config,
        std::env::var("BILLBUDDY_USER").ok(),
        std::env::var("BILLBUDDY_SEED").ok(),
        std::env::var("BILLBUDDY_REQUIRE_TITLE").ok(),
    )
}

fn apply_overrides(
    config: &mut AppConfig,
    user_id: Option<String>,
    seed: Option<String>,
    require_title: Option<String>,
) -> Result<()> {
    if let Some(user_id) = user_id {
        config.user_id = Some(user_id);
    }

    if let Some(seed) = seed {
        config.seed_path = Some(PathBuf::from(seed));
    }

    if let Some(raw) = require_title {
        config.require_title = raw.parse().map_err(|_| Error::Config {
            message: format!("BILLBUDDY_REQUIRE_TITLE must be true or false, got {raw}"),
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            require_title = false
            seed_path = "data/ledger.json"
            user_id = "alice"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.require_title);
        assert_eq!(config.seed_path, Some(PathBuf::from("data/ledger.json")));
        assert_eq!(config.user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.require_title);
        assert_eq!(config.seed_path, None);
        assert_eq!(config.user_id, None);
    }

    #[test]
    fn test_validation_policy_follows_config() {
        let mut config = AppConfig::default();
        assert!(config.validation_policy().require_title);

        config.require_title = false;
        assert!(!config.validation_policy().require_title);
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();

        apply_overrides(
            &mut config,
            Some("bob".to_string()),
            Some("seed.json".to_string()),
            Some("false".to_string()),
        )
        .unwrap();

        assert_eq!(config.user_id.as_deref(), Some("bob"));
        assert_eq!(config.seed_path, Some(PathBuf::from("seed.json")));
        assert!(!config.require_title);
    }

    #[test]
    fn test_absent_overrides_keep_file_values() {
        let mut config = AppConfig {
            require_title: false,
            seed_path: None,
            user_id: Some("alice".to_string()),
        };

        apply_overrides(&mut config, None, None, None).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("alice"));
        assert!(!config.require_title);
    }

    #[test]
    fn test_override_rejects_garbage_boolean() {
        let mut config = AppConfig::default();

        let result = apply_overrides(&mut config, None, None, Some("maybe".to_string()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
