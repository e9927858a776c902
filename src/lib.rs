//! drive-backup - Scheduled Google Drive backups to local zip archives
//!
//! This library mirrors a user's Google Drive into a staging directory,
//! compresses the mirror into a timestamped zip archive, reports the outcome
//! by email, and prunes archives older than a retention period.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Config file location, settings and their validation
//! - `error`: Custom error types
//! - `storage`: Atomic JSON file helpers
//! - `auth`: Stored credential and the Google OAuth flow
//! - `drive`: Remote store abstraction and the Google Drive client
//! - `notify`: Lifecycle notifications and the SendGrid transport
//! - `backup`: The download, archive and retention pipeline
//! - `history`: Run history log
//! - `schedule`: Daily trigger and scheduler loop
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use drive_backup::config::{BackupSettings, ConfigPaths};
//!
//! let paths = ConfigPaths::new()?;
//! let settings = BackupSettings::load_or_default(&paths)?;
//! let config = settings.validate_for_run()?;
//! ```

pub mod auth;
pub mod backup;
pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod history;
pub mod notify;
pub mod schedule;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::{BackupError, BackupResult};
