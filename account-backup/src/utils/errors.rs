//! Custom error types for the account backup crate.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the file-level restore and snapshot steps.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Not a recognized backup: {}", .0.display())]
    NotARecognizedBackup(PathBuf),

    #[error("{} is the account data directory itself", .0.display())]
    SourceIsAccountDirectory(PathBuf),

    #[error("No account files found in {}", .0.display())]
    NoAccountFiles(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RestoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RestoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures reported by an account manager implementation.
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error("Failed to wait for process {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// The account manager could not be stopped or restarted.
///
/// The manager's running state is unknown after this error.
#[derive(Error, Debug)]
pub enum ProcessCoordinationError {
    #[error("Failed to stop account manager: {0}")]
    Stop(#[source] ManagerError),

    #[error("Failed to start account manager: {0}")]
    Start(#[source] ManagerError),
}

/// Errors surfaced by the backup/restore service itself.
///
/// Validation and I/O problems are not errors at this level: they become
/// `Rejected` / `Failure` outcomes.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    ProcessCoordination(#[from] ProcessCoordinationError),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<ProcessCoordinationError> for AppError {
    fn from(e: ProcessCoordinationError) -> Self {
        AppError::Service(ServiceError::ProcessCoordination(e))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
