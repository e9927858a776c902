//! Run history record

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backup::RunOutcome;

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Archive written, nothing skipped
    Success,
    /// Archive written, some files skipped
    Partial,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::Partial => write!(f, "PARTIAL"),
            RunStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One line of the run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Number of files that could not be downloaded
    #[serde(default)]
    pub skipped: usize,

    /// Failure description, including the phase that failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn from_outcome(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcome: &RunOutcome,
    ) -> Self {
        let mut record = Self {
            id: Uuid::new_v4(),
            started_at,
            finished_at,
            status: RunStatus::Failed,
            archive: None,
            size_bytes: None,
            skipped: 0,
            error: None,
        };

        match outcome {
            RunOutcome::Succeeded { archive, skipped } => {
                record.status = if skipped.is_empty() {
                    RunStatus::Success
                } else {
                    RunStatus::Partial
                };
                record.archive = Some(archive.path.clone());
                record.size_bytes = Some(archive.size_bytes);
                record.skipped = skipped.len();
            }
            RunOutcome::Failed { phase, error } => {
                record.error = Some(format!("{} failed: {}", phase, error));
            }
        }

        record
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
