//! Configuration management for the wallet backup tool.
//!
//! Loads configuration from a TOML file; every section has defaults so a
//! partial file is enough.

use crate::utils::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding one subdirectory per backup
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,

    /// Canonical account data file; its stem names every account file
    #[serde(default = "default_account_data_file")]
    pub account_data_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Wallet executable
    #[serde(default = "default_program")]
    pub program: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the wallet process (defaults to the account data directory)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Command that starts an externally supervised wallet (one-shot commands)
    #[serde(default)]
    pub start_command: Vec<String>,

    /// Command that stops an externally supervised wallet (one-shot commands)
    #[serde(default)]
    pub stop_command: Vec<String>,

    /// Seconds to wait after SIGTERM before killing the process
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Take a snapshot periodically while `run` is active
    #[serde(default)]
    pub regular_enabled: bool,

    /// Seconds between regular snapshots
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_backup_root() -> PathBuf {
    PathBuf::from("data/backups")
}

fn default_account_data_file() -> PathBuf {
    PathBuf::from("data/wallet/account.bin")
}

fn default_program() -> PathBuf {
    PathBuf::from("simplewallet")
}

fn default_stop_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            account_data_file: default_account_data_file(),
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            working_dir: None,
            start_command: Vec::new(),
            stop_command: Vec::new(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            regular_enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ManagerConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl BackupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every operation fail later
    pub fn validate(&self) -> Result<()> {
        if self.paths.account_data_file.file_stem().is_none() {
            return Err(AppError::Config(format!(
                "account_data_file has no file name: {}",
                self.paths.account_data_file.display()
            )));
        }
        if self.backup.regular_enabled && self.backup.interval_secs == 0 {
            return Err(AppError::Config(
                "backup.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            backup_root = "/srv/wallet/backups"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.backup_root, PathBuf::from("/srv/wallet/backups"));
        assert_eq!(config.paths.account_data_file, default_account_data_file());
        assert_eq!(config.manager.stop_timeout(), Duration::from_secs(10));
        assert!(!config.backup.regular_enabled);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("wallet-backup.toml");
        std::fs::write(
            &path,
            r#"
            [manager]
            program = "/usr/bin/simplewallet"
            args = ["--wallet-file", "account.bin"]

            [backup]
            regular_enabled = true
            interval_secs = 3600
            "#,
        )?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.manager.args.len(), 2);
        assert_eq!(config.backup.interval(), Duration::from_secs(3600));
        Ok(())
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = Config::default();
        config.backup.regular_enabled = true;
        config.backup.interval_secs = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_account_path_without_name() {
        let mut config = Config::default();
        config.paths.account_data_file = PathBuf::from("/");
        assert!(config.validate().is_err());
    }
}
