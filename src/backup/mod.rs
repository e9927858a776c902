//! The backup pipeline
//!
//! A run mirrors the remote drive into a local staging directory, packs the
//! staging directory into a flat zip archive, reports the result, and wipes
//! the staging directory again. Old archives are pruned separately.
//!
//! # Components
//!
//! - `sanitize`: remote name to local file name mapping
//! - `Downloader`: chunked download of one file
//! - `TreeWalker`: traversal of the remote tree with per-file failure isolation
//! - `archive`: staging directory to zip
//! - `prune`: age-based deletion of old archives
//! - `BackupOrchestrator`: sequencing, notifications, and cleanup
//!
//! # Example
//!
//! ```rust,ignore
//! use drive_backup::backup::{prune, BackupOrchestrator};
//!
//! let orchestrator = BackupOrchestrator::new(paths.clone(), &store, &connector, &notifier);
//! let outcome = orchestrator.run(&paths.archive_base(&chrono::Local::now()));
//! prune(paths.backup_dir(), 30)?;
//! ```

mod archiver;
mod downloader;
mod orchestrator;
mod retention;
mod sanitize;
mod walker;

pub use archiver::{archive, ArchiveArtifact};
pub use downloader::{Downloader, Progress, DEFAULT_CHUNK_SIZE};
pub use orchestrator::{clear_staging, BackupOrchestrator, Phase, RunOutcome};
pub use retention::{prune, prune_at};
pub use sanitize::sanitize_filename;
pub use walker::{SkipList, TreeWalker, WalkSummary};
