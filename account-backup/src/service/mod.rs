//! Backup/restore service - the operations a front end calls.
//!
//! Every operation runs on the blocking pool. Operations that touch the
//! account files or the account manager are single-flight: the gate guard is
//! moved into the worker closure, so dropping the awaiting future does not
//! release it early and a stopped manager is always restarted before the
//! next operation begins.

pub mod outcome;

use crate::backup::store::last_component;
use crate::backup::{
    create_backup_directory, list_backups, resolve_existing_backup_name, AccountFileSet, Backup,
    BackupCatalog,
};
use crate::config::Config;
use crate::manager::{AccountManagerControl, ProcessCoordinator, ProcessState};
use crate::utils::{AppError, RestoreError, ServiceError};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

pub use outcome::{BackupOutcome, CreateBackupRequest, OperationState, RestoreOutcome};

/// Backup and restore operations over one backup root and one set of
/// account files.
///
/// Cheap to clone; clones share the gate and the published state.
#[derive(Clone)]
pub struct BackupRestoreService {
    inner: Arc<Inner>,
    gate: Arc<Mutex<()>>,
}

struct Inner {
    backup_root: PathBuf,
    files: AccountFileSet,
    coordinator: ProcessCoordinator,
    state: watch::Sender<OperationState>,
}

/// Resets the published state when a worker finishes, panics included
struct IdleOnDrop<'a>(&'a watch::Sender<OperationState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(OperationState::Idle);
    }
}

impl BackupRestoreService {
    /// Create a new service; nothing is touched on disk until an operation runs
    pub fn new(backup_root: PathBuf, files: AccountFileSet, coordinator: ProcessCoordinator) -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        Self {
            inner: Arc::new(Inner {
                backup_root,
                files,
                coordinator,
                state,
            }),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Wire the service from configuration around `manager`, whose current state is `initial`.
    pub fn from_config(
        config: &Config,
        manager: Arc<dyn AccountManagerControl>,
        initial: ProcessState,
    ) -> Result<Self, AppError> {
        let files = AccountFileSet::from_account_data_path(&config.paths.account_data_file)?;
        let coordinator = ProcessCoordinator::new(manager, initial);
        Ok(Self::new(config.paths.backup_root.clone(), files, coordinator))
    }

    /// Directory holding one subdirectory per backup
    pub fn backup_root(&self) -> &Path {
        &self.inner.backup_root
    }

    /// The live account files restores write into
    pub fn account_files(&self) -> &AccountFileSet {
        &self.inner.files
    }

    /// Account manager control shared by all operations
    pub fn coordinator(&self) -> &ProcessCoordinator {
        &self.inner.coordinator
    }

    /// Current phase, `Idle` when no operation runs
    pub fn state(&self) -> OperationState {
        *self.inner.state.borrow()
    }

    /// Follow operation phases as they happen
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.inner.state.subscribe()
    }

    /// Run `f` on the blocking pool while holding the single-flight gate.
    async fn run_exclusive<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> T + Send + 'static,
    {
        let guard = self.gate.clone().lock_owned().await;
        let inner = self.inner.clone();

        let value = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let _idle = IdleOnDrop(&inner.state);
            f(&inner)
        })
        .await?;

        Ok(value)
    }

    /// Rescan the backup root
    pub async fn list_backups(&self) -> Result<Vec<Backup>, ServiceError> {
        let root = self.inner.backup_root.clone();
        let backups = tokio::task::spawn_blocking(move || list_backups(&root)).await??;
        Ok(backups)
    }

    /// Rescan the backup root into a fresh catalog
    pub async fn load_catalog(&self) -> Result<BackupCatalog, ServiceError> {
        let mut catalog = BackupCatalog::new();
        catalog.reload(self.list_backups().await?);
        Ok(catalog)
    }

    /// Register a backup directory and return it for the catalog
    pub async fn create_backup(&self, request: CreateBackupRequest) -> Result<BackupOutcome, ServiceError> {
        self.run_exclusive(move |inner| inner.create_backup(&request)).await?
    }

    /// Replace the account files with those in `source`.
    ///
    /// The manager is stopped only after `source` validates, and is always
    /// restarted. Only a failed stop or start is returned as `Err`.
    pub async fn restore_backup(&self, source: PathBuf) -> Result<RestoreOutcome, ServiceError> {
        self.run_exclusive(move |inner| inner.restore_backup(&source)).await?
    }

    /// Restore from the backup called `name` under the backup root
    pub async fn restore_named(&self, name: &str) -> Result<RestoreOutcome, ServiceError> {
        let candidate = self.inner.backup_root.join(name);
        if !is_single_component(Path::new(name)) {
            return Ok(RestoreOutcome::failure(
                candidate,
                format!("invalid backup name: {:?}", name),
            ));
        }
        self.restore_backup(candidate).await
    }

    /// Start the account manager once no operation holds the account files
    pub async fn start_manager(&self) -> Result<(), ServiceError> {
        self.run_exclusive(|inner| inner.coordinator.start_manager())
            .await??;
        Ok(())
    }

    /// Stop the account manager once no operation holds the account files
    pub async fn stop_manager(&self) -> Result<(), ServiceError> {
        self.run_exclusive(|inner| inner.coordinator.stop_manager())
            .await??;
        Ok(())
    }

    /// Copy the live account files into a new timestamped backup
    pub async fn snapshot(&self) -> Result<BackupOutcome, ServiceError> {
        self.run_exclusive(|inner| inner.snapshot()).await?
    }
}

fn is_single_component(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl Inner {
    fn set_state(&self, state: OperationState) {
        self.state.send_replace(state);
    }

    fn create_backup(&self, request: &CreateBackupRequest) -> Result<BackupOutcome, ServiceError> {
        self.set_state(OperationState::Validating);

        let (candidate, name) = match request {
            CreateBackupRequest::DefaultPath(dir) => {
                let name = dir
                    .strip_prefix(&self.backup_root)
                    .ok()
                    .filter(|rel| is_single_component(rel) && dir.is_dir())
                    .and_then(last_component);
                (dir, name)
            }
            CreateBackupRequest::CustomPath(dir) => {
                (dir, resolve_existing_backup_name(&self.backup_root, dir)?)
            }
        };

        match name {
            Some(name) => {
                info!("Registered backup {}", name);
                Ok(BackupOutcome::Created(Backup::new(&self.backup_root, name)))
            }
            None => {
                warn!("{} is not a backup under {}", candidate.display(), self.backup_root.display());
                Ok(BackupOutcome::Rejected {
                    candidate: candidate.clone(),
                })
            }
        }
    }

    fn restore_backup(&self, source: &Path) -> Result<RestoreOutcome, ServiceError> {
        self.set_state(OperationState::Validating);

        let files = match self.files.collect_source_files(source) {
            Ok(files) => files,
            Err(e) => {
                warn!("Restore rejected: {}", e);
                return Ok(RestoreOutcome::failure(source, e));
            }
        };

        info!("Restoring {} files from {}", files.len(), source.display());
        self.set_state(OperationState::StoppingManager);

        let restored = self.coordinator.with_manager_stopped(|| {
            self.set_state(OperationState::CopyingFiles);
            let result = self.files.restore_files(&files);
            self.set_state(OperationState::StartingManager);
            result
        })?;

        match restored {
            Ok(report) => Ok(RestoreOutcome::Success {
                source: source.to_path_buf(),
                report,
            }),
            Err(e) => {
                warn!("Restore from {} failed: {}", source.display(), e);
                Ok(RestoreOutcome::failure(source, e))
            }
        }
    }

    fn snapshot(&self) -> Result<BackupOutcome, ServiceError> {
        self.set_state(OperationState::Validating);

        if self.files.live_files().map_err(restore_io)?.is_empty() {
            let e = RestoreError::NoAccountFiles(self.files.directory().to_path_buf());
            warn!("Snapshot skipped: {}", e);
            return Ok(BackupOutcome::Failed {
                path: self.files.directory().to_path_buf(),
                reason: e.to_string(),
            });
        }

        let backup = create_backup_directory(&self.backup_root, &chrono::Local::now())?;
        self.set_state(OperationState::StoppingManager);

        let copied = self.coordinator.with_manager_stopped(|| {
            self.set_state(OperationState::CopyingFiles);
            let result = self.files.snapshot_into(&backup.directory);
            self.set_state(OperationState::StartingManager);
            result
        });

        match copied {
            Ok(Ok(count)) => {
                info!("Snapshot {} holds {} account files", backup.name, count);
                self.create_backup(&CreateBackupRequest::DefaultPath(backup.directory))
            }
            Ok(Err(e)) => {
                warn!("Snapshot into {} failed: {}", backup.directory.display(), e);
                discard_partial(&backup.directory);
                Ok(BackupOutcome::Failed {
                    path: backup.directory,
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                discard_partial(&backup.directory);
                Err(e.into())
            }
        }
    }
}

fn restore_io(e: RestoreError) -> ServiceError {
    match e {
        RestoreError::Io { source, .. } => ServiceError::Io(source),
        other => ServiceError::Io(std::io::Error::other(other.to_string())),
    }
}

fn discard_partial(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        warn!("Failed to remove incomplete backup {}: {}", dir.display(), e);
    }
}
