//! The account manager: the process that owns the account files while it runs.

pub mod child;
pub mod command;
pub mod coordinator;

use crate::utils::ManagerError;
use serde::Serialize;

pub use child::ChildProcessManager;
pub use command::CommandManager;
pub use coordinator::ProcessCoordinator;

/// Start/stop control over the account manager.
///
/// Both calls block until the manager is in the requested state and succeed
/// when it already is.
pub trait AccountManagerControl: Send + Sync {
    /// Bring the manager up
    fn start(&self) -> Result<(), ManagerError>;

    /// Shut the manager down so it releases the account files
    fn stop(&self) -> Result<(), ManagerError>;
}

/// Last known state of the account manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Running,
    Stopped,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopped => write!(f, "stopped"),
        }
    }
}
