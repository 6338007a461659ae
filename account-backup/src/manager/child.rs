//! Account manager backed by a wallet child process.
//!
//! Stopping sends SIGTERM and waits for the wallet to save and exit; a
//! wallet that does not exit within the timeout is killed.

use super::AccountManagerControl;
use crate::config::ManagerConfig;
use crate::utils::ManagerError;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Supervises the wallet as a child of this process
pub struct ChildProcessManager {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    stop_timeout: Duration,
    child: Mutex<Option<Child>>,
}

impl ChildProcessManager {
    /// Create a manager for `program`; nothing is spawned until `start`
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            stop_timeout: Duration::from_secs(10),
            child: Mutex::new(None),
        }
    }

    /// Build from the `[manager]` config section; `default_dir` is used when no working directory is set.
    pub fn from_config(config: &ManagerConfig, default_dir: Option<PathBuf>) -> Self {
        Self::new(config.program.clone(), config.args.clone())
            .with_working_dir(config.working_dir.clone().or(default_dir))
            .with_stop_timeout(config.stop_timeout())
    }

    /// Set the directory the wallet runs in
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set how long `stop` waits before killing the wallet
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// PID of the live child, if any
    pub fn pid(&self) -> Option<u32> {
        let mut guard = self.lock();
        let child = guard.as_mut()?;
        match child.try_wait() {
            Ok(None) => Some(child.id()),
            _ => None,
        }
    }

    /// Whether the wallet process is alive
    pub fn is_running(&self) -> bool {
        self.pid().is_some()
    }
}

#[cfg(unix)]
fn terminate(child: &Child) -> Result<(), ManagerError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = child.id();
    let raw = i32::try_from(pid).map_err(|_| ManagerError::Signal {
        pid,
        reason: "pid out of range".to_string(),
    })?;

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Already gone, reaped below
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(ManagerError::Signal {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<(), ManagerError> {
    let pid = child.id();
    child.kill().map_err(|e| ManagerError::Signal {
        pid,
        reason: e.to_string(),
    })
}

impl AccountManagerControl for ChildProcessManager {
    fn start(&self) -> Result<(), ManagerError> {
        let mut guard = self.lock();

        if let Some(child) = guard.as_mut() {
            let pid = child.id();
            match child.try_wait() {
                Ok(None) => {
                    debug!("Wallet process {} already running", pid);
                    return Ok(());
                }
                Ok(Some(status)) => warn!("Wallet process {} had exited ({})", pid, status),
                Err(source) => return Err(ManagerError::Wait { pid, source }),
            }
        }

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| ManagerError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        info!("Started wallet process {} ({})", child.id(), self.program.display());
        *guard = Some(child);
        Ok(())
    }

    fn stop(&self) -> Result<(), ManagerError> {
        let mut guard = self.lock();
        let Some(child) = guard.as_mut() else {
            debug!("Wallet process not running");
            return Ok(());
        };
        let pid = child.id();

        if let Some(status) = child.try_wait().map_err(|source| ManagerError::Wait { pid, source })? {
            debug!("Wallet process {} already exited ({})", pid, status);
            *guard = None;
            return Ok(());
        }

        terminate(child)?;

        let deadline = Instant::now() + self.stop_timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(|source| ManagerError::Wait { pid, source })? {
                info!("Wallet process {} stopped ({})", pid, status);
                break;
            }

            if Instant::now() >= deadline {
                warn!(
                    "Wallet process {} did not exit within {:?}, killing it",
                    pid, self.stop_timeout
                );
                if let Err(e) = child.kill() {
                    warn!("Failed to kill wallet process {}: {}", pid, e);
                }
                child.wait().map_err(|source| ManagerError::Wait { pid, source })?;
                break;
            }

            std::thread::sleep(POLL_INTERVAL);
        }

        *guard = None;
        Ok(())
    }
}
