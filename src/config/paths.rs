//! Path management for drive-backup
//!
//! Two kinds of paths live here: where the tool keeps its own configuration
//! (`ConfigPaths`), and the paths a backup run derives from its settings
//! (`BackupPaths`).
//!
//! ## Config Directory Resolution Order
//!
//! 1. `DRIVE_BACKUP_CONFIG_DIR` environment variable (if set)
//! 2. The platform config directory (`~/.config/drive-backup` on Linux,
//!    `~/Library/Application Support/drive-backup` on macOS,
//!    `%APPDATA%\drive-backup\config` on Windows)

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use directories::ProjectDirs;

use crate::error::BackupError;

/// Name of the persisted credential file, stored next to the staging directory
pub const TOKEN_FILE_NAME: &str = "token.json";

/// Name of the run history log, stored in the backup folder
pub const HISTORY_FILE_NAME: &str = "history.jsonl";

/// Extension appended to the archive base path
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Timestamp format used for archive names
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Manages the location of drive-backup's own configuration
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    base_dir: PathBuf,
    settings_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Resolve the config directory
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, BackupError> {
        let base_dir = if let Ok(custom) = std::env::var("DRIVE_BACKUP_CONFIG_DIR") {
            PathBuf::from(custom)
        } else {
            ProjectDirs::from("", "", "drive-backup")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    BackupError::Config("Could not determine the config directory".into())
                })?
        };

        Ok(Self {
            base_dir,
            settings_file: None,
        })
    }

    /// Create ConfigPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            settings_file: None,
        }
    }

    /// Use an explicit settings file instead of `<base dir>/config.json`
    pub fn with_settings_file(mut self, path: PathBuf) -> Self {
        self.settings_file = Some(path);
        self
    }

    /// Get the base config directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| self.base_dir.join("config.json"))
    }
}

/// Paths derived from the download (staging) and backup folders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    staging_dir: PathBuf,
    backup_dir: PathBuf,
}

impl BackupPaths {
    pub fn new(staging_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Local scratch directory holding one run's downloads
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Directory that receives the archives
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Persisted credential, kept in the staging directory's parent
    ///
    /// Never inside the staging directory, which is wiped after every run.
    /// A bare relative staging name puts the token in the working directory.
    pub fn token_file(&self) -> PathBuf {
        match self.staging_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(TOKEN_FILE_NAME),
            _ => PathBuf::from(TOKEN_FILE_NAME),
        }
    }

    /// Run history log
    pub fn history_file(&self) -> PathBuf {
        self.backup_dir.join(HISTORY_FILE_NAME)
    }

    /// Timestamped archive base path (without extension) for a run
    pub fn archive_base<Tz>(&self, at: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.backup_dir
            .join(at.format(ARCHIVE_TIMESTAMP_FORMAT).to_string())
    }
}

/// Append the archive extension to a base path
pub fn archive_path(base: &Path) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    PathBuf::from(name)
}
