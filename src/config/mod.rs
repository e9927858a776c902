//! Configuration module for drive-backup
//!
//! This module provides configuration management including:
//! - Config directory resolution and derived backup paths
//! - Settings persistence and validation

pub mod paths;
pub mod settings;

pub use paths::{BackupPaths, ConfigPaths};
pub use settings::{BackupSettings, NotificationConfig, RunConfig, ScheduleConfig};
