//! Regular account backups while the wallet is supervised.

use crate::service::{BackupOutcome, BackupRestoreService};
use crate::utils::ServiceError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Take a snapshot every `interval` until `cancel` fires.
///
/// The first snapshot happens one interval after start. A coordination
/// failure ends the loop since the wallet state is then unknown.
pub fn start_regular_backups(
    service: BackupRestoreService,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Regular backups every {:?}", interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match service.snapshot().await {
                        Ok(BackupOutcome::Created(backup)) => {
                            info!("Regular backup created: {}", backup.name);
                        }
                        Ok(other) => warn!("Regular backup not created: {:?}", other),
                        Err(ServiceError::ProcessCoordination(e)) => {
                            error!("Regular backups halted: {}", e);
                            break;
                        }
                        Err(e) => warn!("Regular backup failed: {}", e),
                    }
                }
            }
        }

        info!("Regular backups stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::AccountFileSet;
    use crate::manager::{AccountManagerControl, ProcessCoordinator, ProcessState};
    use crate::utils::ManagerError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FlakyManager {
        refuse_stop: AtomicBool,
    }

    impl AccountManagerControl for FlakyManager {
        fn start(&self) -> Result<(), ManagerError> {
            Ok(())
        }

        fn stop(&self) -> Result<(), ManagerError> {
            if self.refuse_stop.load(Ordering::SeqCst) {
                return Err(ManagerError::Other("wallet busy".into()));
            }
            Ok(())
        }
    }

    fn service(temp_dir: &TempDir, manager: Arc<FlakyManager>) -> BackupRestoreService {
        let account = temp_dir.path().join("wallet").join("account.bin");
        std::fs::create_dir_all(account.parent().unwrap()).unwrap();
        std::fs::write(&account, b"bin").unwrap();

        let files = AccountFileSet::from_account_data_path(&account).unwrap();
        let coordinator = ProcessCoordinator::new(manager, ProcessState::Running);
        BackupRestoreService::new(temp_dir.path().join("backups"), files, coordinator)
    }

    #[tokio::test]
    async fn test_takes_snapshots_until_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir, Arc::default());
        let cancel = CancellationToken::new();

        let handle = start_regular_backups(service.clone(), Duration::from_millis(100), cancel.clone());
        tokio::time::sleep(Duration::from_millis(350)).await;
        cancel.cancel();
        handle.await.unwrap();

        let backups = service.list_backups().await.unwrap();
        assert!(!backups.is_empty());
        assert!(backups[0].directory.join("account.bin").is_file());
        assert_eq!(service.coordinator().state(), ProcessState::Running);
    }

    #[tokio::test]
    async fn test_halts_on_coordination_failure() {
        let temp_dir = TempDir::new().unwrap();
        let manager = Arc::new(FlakyManager::default());
        manager.refuse_stop.store(true, Ordering::SeqCst);
        let service = service(&temp_dir, manager);

        let handle = start_regular_backups(service.clone(), Duration::from_millis(50), CancellationToken::new());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop by itself")
            .unwrap();

        // The directory created for the failed snapshot is removed again
        assert!(service.list_backups().await.unwrap().is_empty());
    }
}
