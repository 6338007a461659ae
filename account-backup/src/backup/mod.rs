//! Backup snapshots and the account files they hold.

pub mod account_files;
pub mod catalog;
pub mod store;

pub use account_files::{AccountFileSet, RestoreReport};
pub use catalog::BackupCatalog;
pub use store::{
    create_backup_directory, ensure_backup_root_exists, list_backups, resolve_existing_backup_name,
    Backup,
};
