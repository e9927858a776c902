//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the backup pipeline.

pub mod backup;
pub mod config;
pub mod history;

use std::path::PathBuf;

use clap::Args;

use crate::config::BackupSettings;

pub use backup::{handle_auth, handle_prune, handle_run, handle_schedule};
pub use config::{handle_config_command, ConfigCommands};
pub use history::handle_history;

/// Settings that can be given on the command line or through the environment
///
/// Anything left unset falls back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Folder where files are downloaded during a run (emptied afterwards)
    #[arg(long, env = "DRIVE_BACKUP_DOWNLOAD_FOLDER")]
    pub download_folder: Option<PathBuf>,

    /// Folder where backup archives are saved
    #[arg(long, env = "DRIVE_BACKUP_BACKUP_FOLDER")]
    pub backup_folder: Option<PathBuf>,

    /// Path to the Google OAuth client JSON
    #[arg(long, env = "DRIVE_BACKUP_CLIENT_JSON")]
    pub client_json: Option<PathBuf>,

    /// Hour (0-23, local time) to start the scheduled backup
    #[arg(long)]
    pub hour: Option<u32>,

    /// Minute (0-59) to start the scheduled backup
    #[arg(long)]
    pub minute: Option<u32>,

    /// Delete archives older than this many days
    #[arg(long)]
    pub retention_days: Option<u32>,

    /// SendGrid API key (requires --from-email and --to-email)
    #[arg(long, env = "DRIVE_BACKUP_SENDGRID_API_KEY", hide_env_values = true)]
    pub sendgrid_api_key: Option<String>,

    /// Email to send notifications from
    #[arg(long, env = "DRIVE_BACKUP_FROM_EMAIL")]
    pub from_email: Option<String>,

    /// Email to send notifications to
    #[arg(long, env = "DRIVE_BACKUP_TO_EMAIL")]
    pub to_email: Option<String>,
}

impl SettingsArgs {
    /// Layer these arguments over settings loaded from the config file
    pub fn apply_to(&self, base: BackupSettings) -> BackupSettings {
        base.merge(BackupSettings {
            download_folder: self.download_folder.clone(),
            backup_folder: self.backup_folder.clone(),
            client_json: self.client_json.clone(),
            hour: self.hour,
            minute: self.minute,
            retention_days: self.retention_days,
            sendgrid_api_key: self.sendgrid_api_key.clone(),
            from_email: self.from_email.clone(),
            to_email: self.to_email.clone(),
            ..Default::default()
        })
    }
}
