//! Graceful shutdown handling for SIGTERM and SIGINT.
//!
//! On shutdown the scheduler is cancelled, any in-flight restore or snapshot
//! finishes (it cannot be interrupted), and the wallet process is stopped
//! so it can save its files.

use crate::service::BackupRestoreService;
use crate::utils::ServiceError;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Turns SIGTERM/SIGINT into a cancelled token and a stopped wallet
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token cancelled once shutdown begins
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for SIGTERM or SIGINT, then cancel the token
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = self.token.cancelled() => {}
        }

        self.token.cancel();
    }

    /// Stop the account manager once no operation holds the account files.
    pub async fn shutdown(&self, service: &BackupRestoreService) -> Result<(), ServiceError> {
        self.token.cancel();
        info!("Graceful shutdown initiated");

        let stopped = service.stop_manager().await;
        match &stopped {
            Ok(()) => info!("Graceful shutdown complete"),
            Err(e) => error!("Account manager did not stop cleanly: {}", e),
        }
        stopped
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::AccountFileSet;
    use crate::manager::{AccountManagerControl, ProcessCoordinator, ProcessState};
    use crate::utils::ManagerError;
    use std::sync::Arc;

    struct NoopManager;

    impl AccountManagerControl for NoopManager {
        fn start(&self) -> Result<(), ManagerError> {
            Ok(())
        }

        fn stop(&self) -> Result<(), ManagerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_token_cancelled_on_shutdown() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let files = AccountFileSet::from_account_data_path(&temp_dir.path().join("account.bin")).unwrap();
        let coordinator = ProcessCoordinator::new(Arc::new(NoopManager), ProcessState::Running);
        let service = BackupRestoreService::new(temp_dir.path().join("backups"), files, coordinator);

        let shutdown = ShutdownCoordinator::new();
        let token = shutdown.token();

        let waiter = tokio::spawn(async move { token.cancelled().await });

        shutdown.shutdown(&service).await.unwrap();

        waiter.await.unwrap();
        assert_eq!(service.coordinator().state(), ProcessState::Stopped);
    }
}
