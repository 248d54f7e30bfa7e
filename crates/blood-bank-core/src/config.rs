//! Runtime configuration.
//!
//! Sources, later ones winning:
//! 1. `config/blood-bank.toml` (optional) or an explicit file
//! 2. `BLOOD_BANK__*` environment variables, `__` separating sections
//!    (`BLOOD_BANK__DATABASE__PATH`, `BLOOD_BANK__INVENTORY__ENFORCE_EXPIRY`)

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config/blood-bank.toml";
pub const ENV_PREFIX: &str = "BLOOD_BANK";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite file; in-memory when absent
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InventoryConfig {
    #[serde(default = "default_true")]
    pub enforce_expiry: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            enforce_expiry: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `blood_bank_core=debug`
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BloodBankConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Install the standard ABO/Rh reference data on open
    #[serde(default = "default_true")]
    pub seed_reference_data: bool,
}

impl Default for BloodBankConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            inventory: InventoryConfig::default(),
            logging: LoggingConfig::default(),
            seed_reference_data: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl BloodBankConfig {
    /// Load from the default file location, falling back to env and defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    /// Load from an explicit file, which must exist.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: BloodBankConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid("database.path is empty".into()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    // Loading reads process-wide BLOOD_BANK__* variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = BloodBankConfig::default();
        assert!(config.database.path.is_none());
        assert!(config.inventory.enforce_expiry);
        assert_eq!(config.logging.level, "info");
        assert!(config.seed_reference_data);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
            seed_reference_data = false

            [database]
            path = "/var/lib/blood-bank/core.db"

            [inventory]
            enforce_expiry = false
            "#,
        );

        let _env = env_lock();
        let config = BloodBankConfig::load_from(file.path()).unwrap();
        assert_eq!(config.database.path.as_deref(), Some("/var/lib/blood-bank/core.db"));
        assert!(!config.inventory.enforce_expiry);
        assert!(!config.seed_reference_data);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[logging]\nlevel = \"debug\"\n");
        let _env = env_lock();
        let config = BloodBankConfig::load_from(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.inventory.enforce_expiry);
        assert!(config.seed_reference_data);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let result = BloodBankConfig::load_from(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_empty_path_is_invalid() {
        let file = write_config("[database]\npath = \"  \"\n");
        let _env = env_lock();
        let result = BloodBankConfig::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let file = write_config(
            r#"
            [database]
            path = "/var/lib/blood-bank/file.db"

            [inventory]
            enforce_expiry = true
            "#,
        );

        let _env = env_lock();
        std::env::set_var("BLOOD_BANK__DATABASE__PATH", "/srv/blood-bank/env.db");
        std::env::set_var("BLOOD_BANK__INVENTORY__ENFORCE_EXPIRY", "false");
        std::env::set_var("BLOOD_BANK__SEED_REFERENCE_DATA", "false");

        let result = BloodBankConfig::load_from(file.path());

        std::env::remove_var("BLOOD_BANK__DATABASE__PATH");
        std::env::remove_var("BLOOD_BANK__INVENTORY__ENFORCE_EXPIRY");
        std::env::remove_var("BLOOD_BANK__SEED_REFERENCE_DATA");

        let config = result.unwrap();
        assert_eq!(config.database.path.as_deref(), Some("/srv/blood-bank/env.db"));
        assert!(!config.inventory.enforce_expiry);
        assert!(!config.seed_reference_data);
        assert_eq!(config.logging.level, "info");

        // Without the variables the file wins again
        let config = BloodBankConfig::load_from(file.path()).unwrap();
        assert_eq!(config.database.path.as_deref(), Some("/var/lib/blood-bank/file.db"));
        assert!(config.inventory.enforce_expiry);
        assert!(config.seed_reference_data);
    }
}
