use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drive_backup::cli::{
    handle_auth, handle_config_command, handle_history, handle_prune, handle_run,
    handle_schedule, ConfigCommands, SettingsArgs,
};
use drive_backup::config::{BackupSettings, ConfigPaths};

#[derive(Parser)]
#[command(
    name = "drive-backup",
    version,
    about = "Back up Google Drive to local zip archives",
    long_about = "drive-backup downloads every file in a Google Drive account, \
                  packs them into a timestamped zip archive, emails the result \
                  through SendGrid and deletes archives older than a retention \
                  period. It can run once or every day at a fixed time."
)]
struct Cli {
    /// Settings file to use instead of the default config.json
    #[arg(long, global = true, env = "DRIVE_BACKUP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup now
    Run(SettingsArgs),

    /// Run a backup every day at --hour:--minute and prune old archives
    Schedule(SettingsArgs),

    /// Delete archives older than the retention period
    Prune {
        /// Folder containing the archives
        #[arg(long)]
        backup_folder: Option<PathBuf>,

        /// Delete archives older than this many days
        #[arg(long)]
        retention_days: Option<u32>,
    },

    /// Authorize access to Google Drive and store the token
    Auth(SettingsArgs),

    /// Show or save settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show recent backup runs
    History {
        /// Folder containing the archives and run history
        #[arg(long)]
        backup_folder: Option<PathBuf>,

        /// Number of runs to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

/// Initialize tracing with optional JSON output
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drive_backup=info"));

    // Logs go to stderr so command output stays clean
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut paths = ConfigPaths::new()?;
    if let Some(file) = cli.config {
        paths = paths.with_settings_file(file);
    }
    let stored = BackupSettings::load_or_default(&paths)?;

    match cli.command {
        Commands::Run(args) => handle_run(&args.apply_to(stored))?,
        Commands::Schedule(args) => handle_schedule(&args.apply_to(stored))?,
        Commands::Prune {
            backup_folder,
            retention_days,
        } => handle_prune(&stored, backup_folder, retention_days)?,
        Commands::Auth(args) => handle_auth(&args.apply_to(stored))?,
        Commands::Config(cmd) => handle_config_command(&paths, cmd)?,
        Commands::History {
            backup_folder,
            limit,
        } => handle_history(&stored, backup_folder, limit)?,
    }

    Ok(())
}
