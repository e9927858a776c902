//! History CLI command

use std::path::PathBuf;

use crate::config::{paths::HISTORY_FILE_NAME, BackupSettings};
use crate::error::{BackupError, BackupResult};
use crate::history::{RunHistory, RunRecord};
use crate::notify::format_gigabytes;

/// Print the most recent runs recorded in the backup folder
pub fn handle_history(
    settings: &BackupSettings,
    backup_folder: Option<PathBuf>,
    limit: usize,
) -> BackupResult<()> {
    let backup_folder = backup_folder
        .or_else(|| settings.backup_folder.clone())
        .ok_or_else(|| BackupError::Validation("backup folder must be set".into()))?;

    let history = RunHistory::new(backup_folder.join(HISTORY_FILE_NAME));
    let records = history.read_recent(limit)?;

    if records.is_empty() {
        println!("No backup runs recorded in {}", history.path().display());
        return Ok(());
    }

    println!(
        "{:<20} {:<8} {:>9} {:>10} {:>8}  Archive",
        "Started", "Status", "Duration", "Size (GB)", "Skipped"
    );
    println!("{}", "-".repeat(80));

    // Newest first
    for record in records.iter().rev() {
        println!("{}", format_row(record));
        if let Some(error) = &record.error {
            println!("    {}", error);
        }
    }

    println!();
    println!("Showing {} of the latest run(s)", records.len());

    Ok(())
}

fn format_row(record: &RunRecord) -> String {
    let started = record
        .started_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    let size = record
        .size_bytes
        .map(format_gigabytes)
        .unwrap_or_else(|| "-".into());
    let archive = record
        .archive
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "-".into());

    format!(
        "{:<20} {:<8} {:>8}s {:>10} {:>8}  {}",
        started.to_string(),
        record.status.to_string(),
        record.duration().num_seconds(),
        size,
        record.skipped,
        archive
    )
}
