//! Requests and results of the backup/restore service.

use crate::backup::{Backup, RestoreReport};
use serde::Serialize;
use std::path::PathBuf;

/// How a new backup is handed to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateBackupRequest {
    /// A directory already created directly under the backup root
    DefaultPath(PathBuf),
    /// Any directory; accepted only if its name matches a backup under the root
    CustomPath(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackupOutcome {
    Created(Backup),
    /// Not a backup of this root; pick another directory
    Rejected { candidate: PathBuf },
    /// Snapshot could not be written
    Failed { path: PathBuf, reason: String },
}

impl BackupOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, BackupOutcome::Created(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    Success { source: PathBuf, report: RestoreReport },
    /// `path` is the directory the restore was attempted from
    Failure { path: PathBuf, reason: String },
}

impl RestoreOutcome {
    pub fn failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RestoreOutcome::Failure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RestoreOutcome::Success { .. })
    }
}

/// Phase of the operation currently holding the account files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Idle,
    Validating,
    StoppingManager,
    CopyingFiles,
    StartingManager,
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationState::Idle => "idle",
            OperationState::Validating => "validating",
            OperationState::StoppingManager => "stopping account manager",
            OperationState::CopyingFiles => "copying files",
            OperationState::StartingManager => "starting account manager",
        };
        f.write_str(s)
    }
}
