//! User settings for drive-backup
//!
//! `BackupSettings` is the raw, possibly incomplete record stored in the
//! config file and overridden by command-line flags. Validation turns it into
//! a `RunConfig` (one backup run) or a `ScheduleConfig` (the daily loop).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::{BackupPaths, ConfigPaths};
use crate::error::BackupError;
use crate::storage::file_io::{read_json_optional, write_json_atomic};

/// Settings as stored on disk; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Staging directory that receives downloads during a run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_folder: Option<PathBuf>,

    /// Directory that receives the zip archives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_folder: Option<PathBuf>,

    /// OAuth client secrets file downloaded from the Google Cloud console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_json: Option<PathBuf>,

    /// Hour of day (local time) the scheduled backup starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,

    /// Minute of the hour the scheduled backup starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,

    /// Archives older than this many days are pruned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sendgrid_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_email: Option<String>,
}

fn default_schema_version() -> u32 {
    1
}

/// Email notification addressing, present only when all three parts are set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub api_key: String,
    pub from_email: String,
    pub to_email: String,
}

/// Validated settings for a single backup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub paths: BackupPaths,
    pub client_json: PathBuf,
    pub notification: Option<NotificationConfig>,
}

/// Validated settings for the daily schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub run: RunConfig,
    pub hour: u32,
    pub minute: u32,
    pub retention_days: u32,
}

impl BackupSettings {
    /// Load settings from disk, or return empty settings if the file doesn't exist
    pub fn load_or_default(paths: &ConfigPaths) -> Result<Self, BackupError> {
        let settings_path = paths.settings_file();
        let settings: Option<BackupSettings> = read_json_optional(&settings_path).map_err(|e| {
            BackupError::Config(format!(
                "Failed to load settings from {}: {}",
                settings_path.display(),
                e
            ))
        })?;
        Ok(settings.unwrap_or_else(|| BackupSettings {
            schema_version: default_schema_version(),
            ..Default::default()
        }))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &ConfigPaths) -> Result<(), BackupError> {
        write_json_atomic(paths.settings_file(), self)
    }

    /// Overlay every field that is set in `other` onto `self`
    pub fn merge(mut self, other: BackupSettings) -> Self {
        fn pick<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        pick(&mut self.download_folder, other.download_folder);
        pick(&mut self.backup_folder, other.backup_folder);
        pick(&mut self.client_json, other.client_json);
        pick(&mut self.hour, other.hour);
        pick(&mut self.minute, other.minute);
        pick(&mut self.retention_days, other.retention_days);
        pick(&mut self.sendgrid_api_key, other.sendgrid_api_key);
        pick(&mut self.from_email, other.from_email);
        pick(&mut self.to_email, other.to_email);
        self
    }

    /// Validate the settings needed for one backup run
    pub fn validate_for_run(&self) -> Result<RunConfig, BackupError> {
        let download_folder = required_path(&self.download_folder, "download folder")?;
        let backup_folder = required_path(&self.backup_folder, "backup folder")?;
        let client_json = required_path(&self.client_json, "client JSON")?;

        Ok(RunConfig {
            paths: BackupPaths::new(download_folder, backup_folder),
            client_json,
            notification: self.validate_notification()?,
        })
    }

    /// Validate the settings needed for the daily schedule
    pub fn validate_for_schedule(&self) -> Result<ScheduleConfig, BackupError> {
        let run = self.validate_for_run()?;

        let hour = self
            .hour
            .ok_or_else(|| BackupError::Validation("Hour must be set".into()))?;
        if hour > 23 {
            return Err(BackupError::Validation(format!(
                "Hour must be between 0 and 23, got {}",
                hour
            )));
        }

        let minute = self
            .minute
            .ok_or_else(|| BackupError::Validation("Minute must be set".into()))?;
        if minute > 59 {
            return Err(BackupError::Validation(format!(
                "Minute must be between 0 and 59, got {}",
                minute
            )));
        }

        let retention_days = self.retention_days.ok_or_else(|| {
            BackupError::Validation("Retention days must be set for scheduled backups".into())
        })?;

        Ok(ScheduleConfig {
            run,
            hour,
            minute,
            retention_days,
        })
    }

    /// All or none of the SendGrid key and the two addresses must be supplied
    pub fn validate_notification(&self) -> Result<Option<NotificationConfig>, BackupError> {
        let api_key = non_empty(&self.sendgrid_api_key);
        let from_email = non_empty(&self.from_email);
        let to_email = non_empty(&self.to_email);

        match (api_key, from_email, to_email) {
            (Some(api_key), Some(from_email), Some(to_email)) => Ok(Some(NotificationConfig {
                api_key: api_key.to_string(),
                from_email: from_email.to_string(),
                to_email: to_email.to_string(),
            })),
            (None, None, None) => Ok(None),
            _ => Err(BackupError::Validation(
                "All or none of 'SendGrid API key', 'from email', and 'to email' must be set"
                    .into(),
            )),
        }
    }

    /// Copy of the settings with the API key masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.sendgrid_api_key.is_some() {
            copy.sendgrid_api_key = Some("********".into());
        }
        copy
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required_path(value: &Option<PathBuf>, label: &str) -> Result<PathBuf, BackupError> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
        _ => Err(BackupError::Validation(format!("{} must be set", label))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn complete() -> BackupSettings {
        BackupSettings {
            schema_version: 1,
            download_folder: Some("/srv/drive/staging".into()),
            backup_folder: Some("/srv/archives".into()),
            client_json: Some("/srv/client.json".into()),
            hour: Some(2),
            minute: Some(30),
            retention_days: Some(14),
            sendgrid_api_key: None,
            from_email: None,
            to_email: None,
        }
    }

    fn with_triple(api_key: bool, from: bool, to: bool) -> BackupSettings {
        let mut settings = complete();
        settings.sendgrid_api_key = api_key.then(|| "SG.key".to_string());
        settings.from_email = from.then(|| "backup@example.com".to_string());
        settings.to_email = to.then(|| "me@example.com".to_string());
        settings
    }

    #[test]
    fn test_notification_none_supplied_proceeds() {
        let config = with_triple(false, false, false).validate_for_run().unwrap();
        assert!(config.notification.is_none());
    }

    #[test]
    fn test_notification_all_supplied_proceeds() {
        let config = with_triple(true, true, true).validate_for_run().unwrap();
        let notification = config.notification.unwrap();
        assert_eq!(notification.api_key, "SG.key");
        assert_eq!(notification.to_email, "me@example.com");
    }

    #[test]
    fn test_notification_partial_rejected() {
        let partial = [
            (true, false, false),
            (false, true, false),
            (false, false, true),
            (true, true, false),
            (true, false, true),
            (false, true, true),
        ];
        for (api_key, from, to) in partial {
            let err = with_triple(api_key, from, to).validate_for_run().unwrap_err();
            assert!(err.is_validation(), "{:?}", (api_key, from, to));
        }
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut settings = with_triple(true, true, false);
        settings.to_email = Some("   ".into());
        assert!(settings.validate_for_run().is_err());
    }

    #[test]
    fn test_missing_folder_rejected() {
        let mut settings = complete();
        settings.download_folder = None;
        let err = settings.validate_for_run().unwrap_err();
        assert_eq!(err.to_string(), "Validation error: download folder must be set");
    }

    #[test]
    fn test_schedule_requires_retention() {
        let mut settings = complete();
        settings.retention_days = None;
        assert!(settings.validate_for_schedule().unwrap_err().is_validation());
    }

    #[test]
    fn test_schedule_rejects_bad_time() {
        let mut settings = complete();
        settings.hour = Some(24);
        assert!(settings.validate_for_schedule().is_err());

        let mut settings = complete();
        settings.minute = Some(60);
        assert!(settings.validate_for_schedule().is_err());

        let config = complete().validate_for_schedule().unwrap();
        assert_eq!((config.hour, config.minute, config.retention_days), (2, 30, 14));
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let base = complete();
        let overrides = BackupSettings {
            hour: Some(5),
            ..Default::default()
        };
        let merged = base.clone().merge(overrides);
        assert_eq!(merged.hour, Some(5));
        assert_eq!(merged.minute, base.minute);
        assert_eq!(merged.download_folder, base.download_folder);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ConfigPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(
            BackupSettings::load_or_default(&paths).unwrap().schema_version,
            1
        );

        let settings = with_triple(true, true, true);
        settings.save(&paths).unwrap();

        let loaded = BackupSettings::load_or_default(&paths).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let settings = with_triple(true, true, true).redacted();
        assert_eq!(settings.sendgrid_api_key.as_deref(), Some("********"));
        assert_eq!(settings.from_email.as_deref(), Some("backup@example.com"));
    }
}
