//! Backup snapshots on disk.
//!
//! A backup is a directory directly under the backup root; its name is the
//! directory name. Names created here are timestamps so that name order is
//! chronological order.

use crate::fs::{has_subdirectory, list_top_level, EntryKind};
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `chrono` format for generated backup names (`2023-02-01_134500`)
pub const BACKUP_NAME_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// A point-in-time snapshot under the backup root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backup {
    pub name: String,
    pub directory: PathBuf,
}

impl Backup {
    pub fn new(root: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            directory: root.join(&name),
            name,
        }
    }
}

/// Final component of `path`, ignoring trailing separators.
pub fn last_component(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// All backups under `root`, most recent name first.
///
/// A missing root yields an empty list.
pub fn list_backups(root: &Path) -> std::io::Result<Vec<Backup>> {
    if !root.is_dir() {
        debug!("Backup root {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = list_top_level(root, EntryKind::Directory)?
        .into_iter()
        .map(|e| e.name)
        .collect();

    names.sort();
    Ok(names
        .into_iter()
        .rev()
        .map(|name| Backup::new(root, name))
        .collect())
}

/// Name of the backup `candidate` refers to, if `root` has a backup of that name.
///
/// Only the final component of `candidate` is compared, so a copy of a backup
/// that lives elsewhere still resolves when its name matches.
pub fn resolve_existing_backup_name(root: &Path, candidate: &Path) -> std::io::Result<Option<String>> {
    let Some(name) = last_component(candidate) else {
        return Ok(None);
    };
    if !root.is_dir() {
        return Ok(None);
    }

    if has_subdirectory(root, &name)? {
        Ok(Some(name))
    } else {
        Ok(None)
    }
}

pub fn ensure_backup_root_exists(root: &Path) -> std::io::Result<()> {
    if !root.is_dir() {
        std::fs::create_dir_all(root)?;
        info!("Created backup root {}", root.display());
    }
    Ok(())
}

/// Backup name for a snapshot taken at `now`
pub fn new_backup_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(BACKUP_NAME_FORMAT).to_string()
}

/// Create a fresh, empty backup directory named after `now`.
///
/// Two snapshots within the same second get `_1`, `_2`, ... suffixes, which
/// still sort after the bare name.
pub fn create_backup_directory<Tz: TimeZone>(root: &Path, now: &DateTime<Tz>) -> std::io::Result<Backup>
where
    Tz::Offset: std::fmt::Display,
{
    ensure_backup_root_exists(root)?;

    let base = new_backup_name(now);
    let mut name = base.clone();
    let mut suffix = 0u32;

    loop {
        let directory = root.join(&name);
        match std::fs::create_dir(&directory) {
            Ok(()) => {
                debug!("Created backup directory {}", directory.display());
                return Ok(Backup { name, directory });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                suffix += 1;
                name = format!("{}_{}", base, suffix);
            }
            Err(e) => return Err(e),
        }
    }
}
