//! Wallet account backup library
//!
//! Lists and validates account backups, restores account files from a
//! backup while the wallet process is stopped, and restarts it afterwards.

pub mod backup;
pub mod config;
pub mod daemon;
pub mod fs;
pub mod manager;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use backup::{AccountFileSet, Backup, BackupCatalog};
pub use config::Config;
pub use manager::{
    AccountManagerControl, ChildProcessManager, CommandManager, ProcessCoordinator, ProcessState,
};
pub use service::{BackupOutcome, BackupRestoreService, CreateBackupRequest, RestoreOutcome};
pub use utils::errors::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
