//! Lifecycle notifications
//!
//! The pipeline reports its progress through a `Notifier`, a fire-and-forget
//! sink: delivery problems are logged by the implementation and never reach
//! the caller. Messages are HTML-flavored subject/body pairs.

mod sendgrid;

use std::path::PathBuf;

use tracing::info;

use crate::config::NotificationConfig;
use crate::error::BackupResult;

pub use sendgrid::SendGridNotifier;

/// Destination for lifecycle notifications
pub trait Notifier {
    /// Deliver one message; must not fail
    fn notify(&self, subject: &str, body: &str);

    /// Deliver a lifecycle event
    fn send(&self, notification: &Notification) {
        self.notify(&notification.subject(), &notification.body());
    }
}

/// Notifier that only writes to the log, used when email is not configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, _body: &str) {
        info!(subject, "Notification (email not configured)");
    }
}

/// Build the notifier matching the configured addressing
pub fn from_config(config: Option<&NotificationConfig>) -> BackupResult<Box<dyn Notifier>> {
    Ok(match config {
        Some(config) => Box::new(SendGridNotifier::new(config.clone())?),
        None => Box::new(LogNotifier),
    })
}

/// The events a backup run reports
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The stored credential cannot be refreshed; someone must authorize again
    TokenNeeded,
    Started,
    Succeeded {
        size_bytes: u64,
        skipped: Vec<PathBuf>,
    },
    Failed {
        error: String,
    },
}

impl Notification {
    pub fn subject(&self) -> String {
        match self {
            Notification::TokenNeeded => "[Notification] New Token Needed",
            Notification::Started => "[Starting] Google Drive backup started",
            Notification::Succeeded { .. } => "[Success] Google Drive backup succeeded",
            Notification::Failed { .. } => "[Failed] Google Drive backup failed",
        }
        .to_string()
    }

    pub fn body(&self) -> String {
        match self {
            Notification::TokenNeeded => "<div style='background-color: yellow;'>Your Google Drive \
                backup program requires a new authentication token. Please run the program \
                manually to obtain a new token.</div>"
                .to_string(),
            Notification::Started => {
                "<div style='background-color: yellow;'>Your backup process has started.</div>"
                    .to_string()
            }
            Notification::Succeeded {
                size_bytes,
                skipped,
            } => {
                let mut body = format!(
                    "<div style='background-color: green;'>Your backup was successful. \
                     The final backup size is {} GB.</div>",
                    format_gigabytes(*size_bytes)
                );
                if !skipped.is_empty() {
                    let list = skipped
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join("<br>");
                    body.push_str("<br>Following files were skipped:<br> ");
                    body.push_str(&list);
                }
                body
            }
            Notification::Failed { error } => format!(
                "<div style='background-color: red;'>Your backup failed. Error: {}</div>",
                error
            ),
        }
    }
}

/// Size in GiB with two decimals
pub fn format_gigabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}
