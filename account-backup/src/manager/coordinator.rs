//! Stop → mutate → start around anything that touches live account files.

use super::{AccountManagerControl, ProcessState};
use crate::utils::ProcessCoordinationError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

/// Runs file operations with the account manager stopped and tracks its
/// last known state.
///
/// Callers serialize stop/start themselves; the state lock is only held to
/// read or record the state, never across a manager call.
pub struct ProcessCoordinator {
    manager: Arc<dyn AccountManagerControl>,
    state: Mutex<ProcessState>,
}

impl ProcessCoordinator {
    /// `initial` is the manager's state at construction time.
    pub fn new(manager: Arc<dyn AccountManagerControl>, initial: ProcessState) -> Self {
        Self {
            manager,
            state: Mutex::new(initial),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ProcessState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Last state the manager was successfully moved into
    pub fn state(&self) -> ProcessState {
        *self.lock_state()
    }

    /// Stop the account manager, blocking until it has exited
    pub fn stop_manager(&self) -> Result<(), ProcessCoordinationError> {
        info!("Stopping account manager");
        self.manager.stop().map_err(ProcessCoordinationError::Stop)?;
        *self.lock_state() = ProcessState::Stopped;
        Ok(())
    }

    /// Start the account manager
    pub fn start_manager(&self) -> Result<(), ProcessCoordinationError> {
        info!("Starting account manager");
        self.manager.start().map_err(ProcessCoordinationError::Start)?;
        *self.lock_state() = ProcessState::Running;
        Ok(())
    }

    /// Run `op` with the account manager stopped, then start it again.
    ///
    /// The restart happens on every exit path of `op`, including a panic,
    /// which is resumed afterwards. If the stop fails `op` does not run.
    /// Errors of `op` travel inside `T`; only stop/start failures are
    /// returned as `Err`.
    pub fn with_manager_stopped<T>(
        &self,
        op: impl FnOnce() -> T,
    ) -> Result<T, ProcessCoordinationError> {
        self.stop_manager()?;

        let result = panic::catch_unwind(AssertUnwindSafe(op));
        let restarted = self.start_manager();

        match result {
            Ok(value) => restarted.map(|()| value),
            Err(payload) => {
                if let Err(e) = restarted {
                    error!("Account manager restart failed after panic: {}", e);
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManagerError;

    use std::sync::OnceLock;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingManager {
        calls: Mutex<Vec<&'static str>>,
        fail_stop: bool,
        fail_start: bool,
    }

    impl RecordingManager {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AccountManagerControl for RecordingManager {
        fn start(&self) -> Result<(), ManagerError> {
            self.calls.lock().unwrap().push("start");
            if self.fail_start {
                return Err(ManagerError::Other("start refused".into()));
            }
            Ok(())
        }

        fn stop(&self) -> Result<(), ManagerError> {
            self.calls.lock().unwrap().push("stop");
            if self.fail_stop {
                return Err(ManagerError::Other("stop refused".into()));
            }
            Ok(())
        }
    }

    fn coordinator(manager: &Arc<RecordingManager>) -> ProcessCoordinator {
        ProcessCoordinator::new(manager.clone(), ProcessState::Running)
    }

    #[test]
    fn test_operation_runs_while_stopped() {
        let manager = Arc::new(RecordingManager::default());
        let coordinator = coordinator(&manager);

        let seen = coordinator
            .with_manager_stopped(|| coordinator.state())
            .unwrap();

        assert_eq!(seen, ProcessState::Stopped);
        assert_eq!(coordinator.state(), ProcessState::Running);
        assert_eq!(manager.calls(), ["stop", "start"]);
    }

    #[test]
    fn test_restarts_after_failed_operation() {
        let manager = Arc::new(RecordingManager::default());
        let coordinator = coordinator(&manager);

        let result: Result<Result<(), String>, _> =
            coordinator.with_manager_stopped(|| Err("copy failed".to_string()));

        assert_eq!(result.unwrap(), Err("copy failed".to_string()));
        assert_eq!(coordinator.state(), ProcessState::Running);
        assert_eq!(manager.calls(), ["stop", "start"]);
    }

    #[test]
    fn test_restarts_after_panic() {
        let manager = Arc::new(RecordingManager::default());
        let coordinator = coordinator(&manager);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            coordinator.with_manager_stopped(|| panic!("boom"))
        }));

        assert!(outcome.is_err());
        assert_eq!(coordinator.state(), ProcessState::Running);
        assert_eq!(manager.calls(), ["stop", "start"]);
    }

    #[test]
    fn test_stop_failure_skips_operation() {
        let manager = Arc::new(RecordingManager {
            fail_stop: true,
            ..Default::default()
        });
        let coordinator = coordinator(&manager);
        let mut ran = false;

        let result = coordinator.with_manager_stopped(|| ran = true);

        assert!(matches!(result, Err(ProcessCoordinationError::Stop(_))));
        assert!(!ran);
        assert_eq!(manager.calls(), ["stop"]);
    }

    /// Stops slowly and checks that the state stays readable meanwhile
    struct SlowStopManager {
        coordinator: OnceLock<Arc<ProcessCoordinator>>,
        observed: Mutex<Option<ProcessState>>,
    }

    impl AccountManagerControl for SlowStopManager {
        fn start(&self) -> Result<(), ManagerError> {
            Ok(())
        }

        fn stop(&self) -> Result<(), ManagerError> {
            let Some(coordinator) = self.coordinator.get().cloned() else {
                return Ok(());
            };
            let reader = std::thread::spawn(move || coordinator.state());
            std::thread::sleep(Duration::from_millis(100));
            assert!(reader.is_finished(), "state() blocked behind stop()");
            *self.observed.lock().unwrap() = reader.join().ok();
            Ok(())
        }
    }

    #[test]
    fn test_state_readable_during_stop() {
        let manager = Arc::new(SlowStopManager {
            coordinator: OnceLock::new(),
            observed: Mutex::new(None),
        });
        let coordinator = Arc::new(ProcessCoordinator::new(manager.clone(), ProcessState::Running));
        assert!(manager.coordinator.set(coordinator.clone()).is_ok());

        coordinator.stop_manager().unwrap();

        assert_eq!(*manager.observed.lock().unwrap(), Some(ProcessState::Running));
        assert_eq!(coordinator.state(), ProcessState::Stopped);
    }

    #[test]
    fn test_start_failure_is_reported() {
        let manager = Arc::new(RecordingManager {
            fail_start: true,
            ..Default::default()
        });
        let coordinator = coordinator(&manager);

        let result = coordinator.with_manager_stopped(|| 42);

        assert!(matches!(result, Err(ProcessCoordinationError::Start(_))));
        assert_eq!(coordinator.state(), ProcessState::Stopped);
    }
}
