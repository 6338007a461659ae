//! The live account data files.
//!
//! Every account file is `<base name>.<ext>` inside the account data
//! directory, e.g. `account.bin` and `account.keys`. Restoring copies each
//! file of a backup to `<base name>.<its ext>`; nothing is parsed.

use crate::fs::{list_top_level, EntryKind};
use crate::utils::{AppError, RestoreError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Location and naming of the live account files
#[derive(Debug, Clone)]
pub struct AccountFileSet {
    directory: PathBuf,
    base_name: String,
}

/// True when both paths resolve to the same existing file or directory
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// What a restore wrote
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    pub files: Vec<PathBuf>,
    pub bytes: u64,
}

impl AccountFileSet {
    /// Derive the account directory and base name from the canonical account data file.
    pub fn from_account_data_path(path: &Path) -> Result<Self, AppError> {
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::Config(format!("account data path has no file name: {}", path.display()))
            })?;
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            directory,
            base_name,
        })
    }

    /// Directory holding the account files
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File stem shared by all account files
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Where a file with `source`'s extension lands in the account directory
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        let file_name = match source.extension() {
            Some(ext) => format!("{}.{}", self.base_name, ext.to_string_lossy()),
            None => self.base_name.clone(),
        };
        self.directory.join(file_name)
    }

    /// Validate `source` and return its top-level files.
    ///
    /// A missing directory or one without any regular file is not a backup.
    /// Neither is the account directory itself: copying a file onto itself
    /// truncates it.
    pub fn collect_source_files(&self, source: &Path) -> Result<Vec<PathBuf>, RestoreError> {
        if !source.is_dir() {
            return Err(RestoreError::NotARecognizedBackup(source.to_path_buf()));
        }
        if same_location(source, &self.directory) {
            return Err(RestoreError::SourceIsAccountDirectory(source.to_path_buf()));
        }

        let files: Vec<PathBuf> = list_top_level(source, EntryKind::File)
            .map_err(|e| RestoreError::io(source, e))?
            .into_iter()
            .map(|e| e.path)
            .collect();

        if files.is_empty() {
            return Err(RestoreError::NotARecognizedBackup(source.to_path_buf()));
        }
        Ok(files)
    }

    /// Copy `files` over the account files. Must only run while the account manager is stopped.
    pub fn restore_files(&self, files: &[PathBuf]) -> Result<RestoreReport, RestoreError> {
        std::fs::create_dir_all(&self.directory).map_err(|e| RestoreError::io(&self.directory, e))?;

        let mut report = RestoreReport::default();
        for source in files.iter().rev() {
            let destination = self.destination_for(source);
            if same_location(source, &destination) {
                debug!("{} is already the account file, skipping", source.display());
                continue;
            }
            let bytes = std::fs::copy(source, &destination).map_err(|e| RestoreError::io(source, e))?;
            debug!("Restored {} -> {} ({} bytes)", source.display(), destination.display(), bytes);

            report.bytes += bytes;
            report.files.push(destination);
        }

        info!(
            "Restored {} account files ({} bytes) into {}",
            report.files.len(),
            report.bytes,
            self.directory.display()
        );
        Ok(report)
    }

    /// Validate and restore in one step
    pub fn restore_from(&self, source: &Path) -> Result<RestoreReport, RestoreError> {
        let files = self.collect_source_files(source)?;
        self.restore_files(&files)
    }

    /// Account files currently present (stem equals the base name)
    pub fn live_files(&self) -> Result<Vec<PathBuf>, RestoreError> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }
        Ok(list_top_level(&self.directory, EntryKind::File)
            .map_err(|e| RestoreError::io(&self.directory, e))?
            .into_iter()
            .filter(|e| {
                Path::new(&e.name)
                    .file_stem()
                    .is_some_and(|stem| stem.to_string_lossy() == self.base_name)
            })
            .map(|e| e.path)
            .collect())
    }

    /// Copy the live account files into `target`, keeping their names.
    pub fn snapshot_into(&self, target: &Path) -> Result<usize, RestoreError> {
        let files = self.live_files()?;
        if files.is_empty() {
            return Err(RestoreError::NoAccountFiles(self.directory.clone()));
        }

        std::fs::create_dir_all(target).map_err(|e| RestoreError::io(target, e))?;
        for source in &files {
            let Some(name) = source.file_name() else {
                continue;
            };
            std::fs::copy(source, target.join(name)).map_err(|e| RestoreError::io(source, e))?;
        }

        info!("Copied {} account files to {}", files.len(), target.display());
        Ok(files.len())
    }
}
