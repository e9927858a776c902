//! Config CLI commands
//!
//! Shows or persists the settings obtained by layering command-line flags
//! over the config file.

use clap::Subcommand;

use super::SettingsArgs;
use crate::config::{BackupSettings, ConfigPaths};
use crate::error::{BackupError, BackupResult};

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings (API key masked)
    Show(SettingsArgs),

    /// Write the effective settings to the config file
    Save(SettingsArgs),
}

/// Handle a config command
pub fn handle_config_command(paths: &ConfigPaths, cmd: ConfigCommands) -> BackupResult<()> {
    let stored = BackupSettings::load_or_default(paths)?;

    match cmd {
        ConfigCommands::Show(args) => {
            let settings = args.apply_to(stored);
            let json = serde_json::to_string_pretty(&settings.redacted()).map_err(|e| {
                BackupError::Json(format!("Failed to serialize settings: {}", e))
            })?;

            println!("Config file: {}", paths.settings_file().display());
            println!();
            println!("{}", json);
        }

        ConfigCommands::Save(args) => {
            let settings = args.apply_to(stored);
            // A triple that would fail every run is not worth saving
            settings.validate_notification()?;
            settings.save(paths)?;
            println!("Settings saved to: {}", paths.settings_file().display());
        }
    }

    Ok(())
}
