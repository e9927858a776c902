//! Append-only run history log
//!
//! Each run is written as a single JSON line and flushed immediately.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;

use tracing::warn;

use crate::error::{BackupError, BackupResult};

use super::record::RunRecord;

/// Handles writing run records to the history file (JSONL)
#[derive(Debug, Clone)]
pub struct RunHistory {
    log_path: PathBuf,
}

impl RunHistory {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append one record
    pub fn append(&self, record: &RunRecord) -> BackupResult<()> {
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    BackupError::Io(format!("Failed to create history directory: {}", e))
                })?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| BackupError::Io(format!("Failed to open run history: {}", e)))?;

        let json = serde_json::to_string(record)
            .map_err(|e| BackupError::Json(format!("Failed to serialize run record: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| BackupError::Io(format!("Failed to write run record: {}", e)))?;

        file.flush()
            .map_err(|e| BackupError::Io(format!("Failed to flush run history: {}", e)))?;

        Ok(())
    }

    /// Read all records, oldest first
    ///
    /// Lines that do not parse as a record are logged and skipped so one bad
    /// write cannot hide the rest of the history.
    pub fn read_all(&self) -> BackupResult<Vec<RunRecord>> {
        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BackupError::Io(format!(
                    "Failed to open run history {}: {}",
                    self.log_path.display(),
                    e
                )))
            }
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Stopped reading run history");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RunRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = index + 1, error = %e, "Skipping unreadable run record"),
            }
        }

        Ok(records)
    }

    /// The last `count` runs, oldest first
    pub fn read_recent(&self, count: usize) -> BackupResult<Vec<RunRecord>> {
        let mut records = self.read_all()?;
        let skip = records.len().saturating_sub(count);
        Ok(records.split_off(skip))
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::record::RunStatus;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(status: RunStatus) -> RunRecord {
        let now = Utc::now();
        RunRecord {
            id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            status,
            archive: None,
            size_bytes: None,
            skipped: 0,
            error: None,
        }
    }

    #[test]
    fn test_append_and_read() {
        let temp = TempDir::new().unwrap();
        let history = RunHistory::new(temp.path().join("nested").join("history.jsonl"));

        history.append(&record(RunStatus::Success)).unwrap();
        history.append(&record(RunStatus::Failed)).unwrap();

        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, RunStatus::Failed);
    }

    #[test]
    fn test_read_recent() {
        let temp = TempDir::new().unwrap();
        let history = RunHistory::new(temp.path().join("history.jsonl"));
        for _ in 0..4 {
            history.append(&record(RunStatus::Success)).unwrap();
        }
        history.append(&record(RunStatus::Partial)).unwrap();

        let recent = history.read_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].status, RunStatus::Partial);
        assert_eq!(history.read_recent(10).unwrap().len(), 5);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let history = RunHistory::new(temp.path().join("history.jsonl"));
        assert!(history.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let temp = TempDir::new().unwrap();
        let history = RunHistory::new(temp.path().join("history.jsonl"));
        history.append(&record(RunStatus::Success)).unwrap();
        OpenOptions::new()
            .append(true)
            .open(history.path())
            .unwrap()
            .write_all(b"{\"id\": truncated\n")
            .unwrap();
        history.append(&record(RunStatus::Failed)).unwrap();

        let records = history.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, RunStatus::Success);
        assert_eq!(records[1].status, RunStatus::Failed);
    }
}
