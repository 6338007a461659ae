//! Account manager controlled through external commands.
//!
//! Used when the wallet is supervised elsewhere, e.g. by systemd:
//! `stop_command = ["systemctl", "stop", "wallet"]`. An empty command means
//! there is nothing to do for that transition.

use super::AccountManagerControl;
use crate::config::ManagerConfig;
use crate::utils::ManagerError;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Runs a fixed argv for each transition and waits for it to finish
#[derive(Debug, Clone, Default)]
pub struct CommandManager {
    start_command: Vec<String>,
    stop_command: Vec<String>,
}

impl CommandManager {
    /// Create a manager from start and stop argv lists; either may be empty
    pub fn new(start_command: Vec<String>, stop_command: Vec<String>) -> Self {
        Self {
            start_command,
            stop_command,
        }
    }

    /// Build from the `start_command` and `stop_command` config entries
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::new(config.start_command.clone(), config.stop_command.clone())
    }

    /// True when neither transition runs anything
    pub fn is_noop(&self) -> bool {
        self.start_command.is_empty() && self.stop_command.is_empty()
    }
}

fn run_command(argv: &[String]) -> Result<(), ManagerError> {
    let Some((program, args)) = argv.split_first() else {
        debug!("No command configured, skipping");
        return Ok(());
    };

    let shown = argv.join(" ");
    info!("Running {}", shown);

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .map_err(|source| ManagerError::Spawn {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ManagerError::CommandFailed {
            command: shown,
            status: status.to_string(),
        })
    }
}

impl AccountManagerControl for CommandManager {
    fn start(&self) -> Result<(), ManagerError> {
        run_command(&self.start_command)
    }

    fn stop(&self) -> Result<(), ManagerError> {
        run_command(&self.stop_command)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_commands_are_noops() {
        let manager = CommandManager::default();
        assert!(manager.is_noop());
        assert!(manager.stop().is_ok());
        assert!(manager.start().is_ok());
    }

    #[test]
    fn test_runs_commands() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let marker = temp_dir.path().join("stopped");
        let manager = CommandManager::new(
            argv(&["true"]),
            argv(&["touch", marker.to_str().unwrap()]),
        );

        manager.stop().unwrap();
        assert!(marker.exists());
        manager.start().unwrap();
    }

    #[test]
    fn test_failing_command() {
        let manager = CommandManager::new(argv(&["false", "--quiet"]), Vec::new());
        match manager.start() {
            Err(ManagerError::CommandFailed { command, .. }) => assert_eq!(command, "false --quiet"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
