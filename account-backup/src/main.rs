//! wallet-backup - Main entry point
//!
//! Command line front end for the account backup service.

use account_backup::{
    backup::ensure_backup_root_exists,
    daemon::{start_regular_backups, ShutdownCoordinator},
    utils, BackupOutcome, BackupRestoreService, ChildProcessManager, CommandManager, Config,
    CreateBackupRequest, ProcessState, RestoreOutcome,
};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List backups, most recent first
    List {
        /// Print JSON instead of one name per line
        #[arg(long)]
        json: bool,
    },

    /// Snapshot the account files, or register an existing backup directory
    Create {
        /// Existing backup directory to register instead of taking a snapshot
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Restore the account files from a backup
    Restore {
        /// Backup name under the backup root
        #[arg(required_unless_present = "from", conflicts_with = "from")]
        name: Option<String>,

        /// Restore from an arbitrary directory
        #[arg(long, value_name = "DIR")]
        from: Option<PathBuf>,
    },

    /// Run the wallet until SIGINT/SIGTERM, taking regular backups if enabled
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::debug!(
        "wallet-backup v{} (backup root: {}, account data: {})",
        env!("CARGO_PKG_VERSION"),
        config.paths.backup_root.display(),
        config.paths.account_data_file.display()
    );

    match args.command {
        Command::List { json } => {
            let service = one_shot_service(&config, false)?;
            let catalog = service.load_catalog().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.names())?);
            } else {
                for name in catalog.names() {
                    println!("{}", name);
                }
            }
        }

        Command::Create { dir } => {
            let service = one_shot_service(&config, dir.is_none())?;
            let outcome = match dir {
                Some(dir) => service.create_backup(CreateBackupRequest::CustomPath(dir)).await?,
                None => service.snapshot().await?,
            };
            report_backup(&outcome)?;
        }

        Command::Restore { name, from } => {
            let service = one_shot_service(&config, true)?;
            let outcome = match (from, name) {
                (Some(dir), _) => service.restore_backup(dir).await?,
                (None, Some(name)) => service.restore_named(&name).await?,
                (None, None) => bail!("either a backup name or --from is required"),
            };
            report_restore(&outcome)?;
        }

        Command::Run => {
            let default_dir = config.paths.account_data_file.parent().map(PathBuf::from);
            let manager = Arc::new(ChildProcessManager::from_config(&config.manager, default_dir));
            let service = BackupRestoreService::from_config(&config, manager, ProcessState::Stopped)?;
            run(&config, service).await?;
        }
    }

    Ok(())
}

/// Service for a single command against a wallet supervised elsewhere.
fn one_shot_service(config: &Config, touches_account_files: bool) -> Result<BackupRestoreService> {
    let manager = CommandManager::from_config(&config.manager);
    if touches_account_files && manager.is_noop() {
        tracing::warn!("No manager.stop_command configured; make sure the wallet is not running");
    }
    Ok(BackupRestoreService::from_config(
        config,
        Arc::new(manager),
        ProcessState::Running,
    )?)
}

async fn run(config: &Config, service: BackupRestoreService) -> Result<()> {
    let root = service.backup_root().to_path_buf();
    tokio::task::spawn_blocking(move || ensure_backup_root_exists(&root)).await??;

    service.start_manager().await?;
    tracing::info!("Wallet started; backups in {}", service.backup_root().display());

    let shutdown = ShutdownCoordinator::new();

    let scheduler = config.backup.regular_enabled.then(|| {
        start_regular_backups(service.clone(), config.backup.interval(), shutdown.token())
    });

    shutdown.wait_for_signal().await;

    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::error!("Regular backup task panicked: {}", e);
        }
    }

    shutdown.shutdown(&service).await?;
    Ok(())
}

fn report_backup(outcome: &BackupOutcome) -> Result<()> {
    match outcome {
        BackupOutcome::Created(backup) => {
            println!("{}", backup.name);
            Ok(())
        }
        BackupOutcome::Rejected { candidate } => {
            bail!("{} is not a backup in the backup directory", candidate.display())
        }
        BackupOutcome::Failed { path, reason } => {
            bail!("backup into {} failed: {}", path.display(), reason)
        }
    }
}

fn report_restore(outcome: &RestoreOutcome) -> Result<()> {
    match outcome {
        RestoreOutcome::Success { source, report } => {
            println!(
                "Restored {} files ({} bytes) from {}",
                report.files.len(),
                report.bytes,
                source.display()
            );
            Ok(())
        }
        RestoreOutcome::Failure { path, reason } => {
            bail!("could not restore the account from {}: {}", path.display(), reason)
        }
    }
}
