//! One end-to-end backup run
//!
//! Phases run in a fixed order: authenticate, announce the start, walk the
//! remote tree into the staging directory, archive it, report the result.
//! Whatever happens in between, the run ends by emptying the staging
//! directory. Failures never escape `run`; they become a "failed"
//! notification and a history record.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::archiver::{archive, ArchiveArtifact};
use super::walker::{SkipList, TreeWalker};
use crate::auth::CredentialSource;
use crate::config::BackupPaths;
use crate::drive::{Connector, ROOT_FOLDER_ID};
use crate::error::BackupError;
use crate::history::{RunHistory, RunRecord};
use crate::notify::{Notification, Notifier};

/// Pipeline phase, used for logging and failure attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authenticating,
    Connecting,
    Walking,
    Archiving,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Authenticating => write!(f, "authenticating"),
            Phase::Connecting => write!(f, "connecting"),
            Phase::Walking => write!(f, "downloading"),
            Phase::Archiving => write!(f, "archiving"),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Archive written; `skipped` lists files that could not be downloaded
    Succeeded {
        archive: ArchiveArtifact,
        skipped: SkipList,
    },
    Failed {
        phase: Phase,
        error: String,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }

    /// Succeeded, but with at least one skipped file
    pub fn is_partial(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { skipped, .. } if !skipped.is_empty())
    }
}

pub struct BackupOrchestrator<'a> {
    paths: BackupPaths,
    credentials: &'a dyn CredentialSource,
    connector: &'a dyn Connector,
    notifier: &'a dyn Notifier,
    history: Option<RunHistory>,
    remote_root: String,
}

impl<'a> BackupOrchestrator<'a> {
    pub fn new(
        paths: BackupPaths,
        credentials: &'a dyn CredentialSource,
        connector: &'a dyn Connector,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            paths,
            credentials,
            connector,
            notifier,
            history: None,
            remote_root: ROOT_FOLDER_ID.to_string(),
        }
    }

    /// Append a record for every run to this history log
    pub fn with_history(mut self, history: RunHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Back up a folder other than the drive root
    pub fn with_remote_root(mut self, folder_id: impl Into<String>) -> Self {
        self.remote_root = folder_id.into();
        self
    }

    pub fn paths(&self) -> &BackupPaths {
        &self.paths
    }

    /// Run the pipeline once, writing the archive to `<archive_base>.zip`
    pub fn run(&self, archive_base: &Path) -> RunOutcome {
        let started_at = Utc::now();

        let outcome = match self.execute(archive_base) {
            Ok((archive, skipped)) => RunOutcome::Succeeded { archive, skipped },
            Err((phase, e)) => {
                error!(%phase, error = %e, "Backup failed");
                RunOutcome::Failed {
                    phase,
                    error: e.to_string(),
                }
            }
        };

        self.notifier.send(&notification_for(&outcome));

        debug!(phase = "cleanup", "Entering phase");
        clear_staging(self.paths.staging_dir());

        if let Some(history) = &self.history {
            let record = RunRecord::from_outcome(started_at, Utc::now(), &outcome);
            if let Err(e) = history.append(&record) {
                warn!(error = %e, "Failed to record run history");
            }
        }

        outcome
    }

    fn execute(
        &self,
        archive_base: &Path,
    ) -> Result<(ArchiveArtifact, SkipList), (Phase, BackupError)> {
        debug!(phase = %Phase::Authenticating, "Entering phase");
        let credential = self
            .credentials
            .obtain(self.notifier)
            .map_err(|e| (Phase::Authenticating, e))?;

        debug!(phase = %Phase::Connecting, "Entering phase");
        let store = self
            .connector
            .connect(&credential)
            .map_err(|e| (Phase::Connecting, e))?;

        self.notifier.send(&Notification::Started);
        info!("Backup started");

        debug!(phase = %Phase::Walking, "Entering phase");
        let skipped = TreeWalker::new(store.as_ref())
            .walk(&self.remote_root, self.paths.staging_dir())
            .map_err(|e| (Phase::Walking, e))?;

        debug!(phase = %Phase::Archiving, "Entering phase");
        let artifact = archive(self.paths.staging_dir(), archive_base)
            .map_err(|e| (Phase::Archiving, e))?;

        info!(
            archive = %artifact.path.display(),
            bytes = artifact.size_bytes,
            skipped = skipped.len(),
            "Backup succeeded"
        );
        Ok((artifact, skipped))
    }
}

fn notification_for(outcome: &RunOutcome) -> Notification {
    match outcome {
        RunOutcome::Succeeded { archive, skipped } => Notification::Succeeded {
            size_bytes: archive.size_bytes,
            skipped: skipped.iter().cloned().collect(),
        },
        RunOutcome::Failed { error, .. } => Notification::Failed {
            error: error.clone(),
        },
    }
}

/// Remove every entry inside `dir`, keeping `dir` itself
///
/// Per-entry failures are logged and do not stop the sweep. Returns the
/// paths that could not be removed.
pub fn clear_staging(dir: &Path) -> Vec<PathBuf> {
    let mut failed = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot read staging directory");
            return failed;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(error = %e, "Failed to read staging entry");
                continue;
            }
        };

        // symlink_metadata so links are removed, never followed
        let result = fs::symlink_metadata(&path).and_then(|meta| {
            if meta.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            }
        });
        if let Err(e) = result {
            warn!("Failed to delete {}. Reason: {}", path.display(), e);
            failed.push(path);
        }
    }

    failed
}
