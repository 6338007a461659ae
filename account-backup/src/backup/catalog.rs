//! In-memory view of the available backups, most recent first.
//!
//! Owned by the interactive side; worker tasks only hand it results.

use super::store::Backup;

/// Backup names as shown to the user
#[derive(Debug, Clone, Default)]
pub struct BackupCatalog {
    names: Vec<String>,
}

impl BackupCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with a full rescan (already ordered by `list_backups`)
    pub fn reload(&mut self, backups: Vec<Backup>) {
        self.names = backups.into_iter().map(|b| b.name).collect();
    }

    /// Prepend a newly created backup. Returns false if the name was already listed.
    pub fn record(&mut self, backup: &Backup) -> bool {
        if self.contains(&backup.name) {
            return false;
        }
        self.names.insert(0, backup.name.clone());
        true
    }

    /// Whether a backup called `name` is listed
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Names, most recent first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
