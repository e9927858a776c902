//! Age-based pruning of old archives
//!
//! A file directly inside the archive directory is deleted once its age
//! (now minus last modification) is strictly greater than the retention
//! period. Subdirectories are neither descended into nor removed, and the run
//! history log that lives beside the archives is always kept. The cutoff is
//! recomputed from the wall clock on every pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::config::paths::HISTORY_FILE_NAME;
use crate::error::{BackupError, BackupResult};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Delete archives older than `retention_days` days, returning what was removed
pub fn prune(archive_dir: &Path, retention_days: u32) -> BackupResult<Vec<PathBuf>> {
    prune_at(archive_dir, retention_days, SystemTime::now())
}

/// `prune` evaluated against a fixed point in time
pub fn prune_at(
    archive_dir: &Path,
    retention_days: u32,
    now: SystemTime,
) -> BackupResult<Vec<PathBuf>> {
    let cutoff = Duration::from_secs(u64::from(retention_days) * SECONDS_PER_DAY);
    let mut deleted = Vec::new();

    let entries = fs::read_dir(archive_dir).map_err(|e| {
        BackupError::Io(format!(
            "Failed to read archive directory {}: {}",
            archive_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if entry.file_name() == HISTORY_FILE_NAME {
            continue;
        }

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot stat, skipping");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "No modification time, skipping");
                continue;
            }
        };
        // Files stamped in the future have age zero
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= cutoff {
            debug!(path = %path.display(), age_secs = age.as_secs(), "Keeping");
            continue;
        }

        info!("Deleting old file: {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => deleted.push(path),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old file"),
        }
    }

    Ok(deleted)
}
