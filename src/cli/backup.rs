//! Backup CLI commands
//!
//! Implements the one-shot run, the daily schedule, manual pruning and
//! interactive authorization.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::auth::{CredentialStore, GoogleOAuth};
use crate::backup::{prune, BackupOrchestrator, RunOutcome};
use crate::config::{BackupPaths, BackupSettings, RunConfig};
use crate::drive::GoogleDriveConnector;
use crate::error::{BackupError, BackupResult};
use crate::history::RunHistory;
use crate::notify;
use crate::schedule::{DailyTrigger, Scheduler, SystemClock};

/// Run the pipeline once
pub fn handle_run(settings: &BackupSettings) -> BackupResult<()> {
    let config = settings.validate_for_run()?;

    let credentials = credential_store(&config)?;
    let connector = GoogleDriveConnector::new()?;
    let notifier = notify::from_config(config.notification.as_ref())?;
    let orchestrator = BackupOrchestrator::new(
        config.paths.clone(),
        &credentials,
        &connector,
        notifier.as_ref(),
    )
    .with_history(RunHistory::new(config.paths.history_file()));

    println!("Starting backup...");
    let outcome = orchestrator.run(&config.paths.archive_base(&Local::now()));
    print_outcome(&outcome);

    match outcome {
        RunOutcome::Succeeded { .. } => Ok(()),
        RunOutcome::Failed { phase, error } => Err(BackupError::Pipeline(format!(
            "Backup failed while {}: {}",
            phase, error
        ))),
    }
}

/// Run the pipeline every day at the configured time, pruning after each run
///
/// Only returns on a configuration error.
pub fn handle_schedule(settings: &BackupSettings) -> BackupResult<()> {
    let config = settings.validate_for_schedule()?;
    let run = &config.run;

    let credentials = credential_store(run)?;
    let connector = GoogleDriveConnector::new()?;
    let notifier = notify::from_config(run.notification.as_ref())?;
    let orchestrator = BackupOrchestrator::new(
        run.paths.clone(),
        &credentials,
        &connector,
        notifier.as_ref(),
    )
    .with_history(RunHistory::new(run.paths.history_file()));

    let trigger = DailyTrigger::new(config.hour, config.minute)?;
    println!(
        "Backups scheduled daily at {:02}:{:02}, keeping {} days of archives.",
        config.hour, config.minute, config.retention_days
    );

    Scheduler::new(SystemClock, trigger).run(None, |at| {
        let outcome = orchestrator.run(&run.paths.archive_base(&at));
        print_outcome(&outcome);
        prune_logged(run.paths.backup_dir(), config.retention_days);
    });

    Ok(())
}

/// Delete archives older than the retention period
pub fn handle_prune(
    settings: &BackupSettings,
    backup_folder: Option<PathBuf>,
    retention_days: Option<u32>,
) -> BackupResult<()> {
    let backup_folder = backup_folder
        .or_else(|| settings.backup_folder.clone())
        .ok_or_else(|| BackupError::Validation("backup folder must be set".into()))?;
    let retention_days = retention_days
        .or(settings.retention_days)
        .ok_or_else(|| BackupError::Validation("Retention days must be set".into()))?;

    let deleted = prune(&backup_folder, retention_days)?;

    if deleted.is_empty() {
        println!("No archives older than {} days.", retention_days);
    } else {
        println!("Deleted {} archive(s):", deleted.len());
        for path in &deleted {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

/// Run the browser consent flow now and store the token
pub fn handle_auth(settings: &BackupSettings) -> BackupResult<()> {
    let download_folder = settings
        .download_folder
        .clone()
        .ok_or_else(|| BackupError::Validation("download folder must be set".into()))?;
    let client_json = settings
        .client_json
        .clone()
        .ok_or_else(|| BackupError::Validation("client JSON must be set".into()))?;

    let token_file = BackupPaths::new(download_folder, PathBuf::new()).token_file();
    let store = CredentialStore::new(token_file, GoogleOAuth::new(client_json)?);
    store.authorize_now()?;

    println!("Authorization complete.");
    println!("Token saved to: {}", store.token_path().display());
    Ok(())
}

fn credential_store(config: &RunConfig) -> BackupResult<CredentialStore<GoogleOAuth>> {
    Ok(CredentialStore::new(
        config.paths.token_file(),
        GoogleOAuth::new(&config.client_json)?,
    ))
}

fn prune_logged(backup_dir: &Path, retention_days: u32) {
    match prune(backup_dir, retention_days) {
        Ok(deleted) if !deleted.is_empty() => {
            info!(count = deleted.len(), "Pruned old archives");
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Failed to prune old archives"),
    }
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Succeeded { archive, skipped } => {
            println!("Backup created: {}", archive.path.display());
            println!(
                "Size: {} GB ({} files)",
                notify::format_gigabytes(archive.size_bytes),
                archive.file_count
            );
            if !skipped.is_empty() {
                println!("Skipped {} file(s):", skipped.len());
                for path in skipped.iter() {
                    println!("  {}", path.display());
                }
            }
        }
        RunOutcome::Failed { phase, error } => {
            println!("Backup failed while {}: {}", phase, error);
        }
    }
}
