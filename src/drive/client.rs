//! Google Drive v3 REST client

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

use super::{Connector, EntryKind, Page, RemoteEntry, RemoteStore};
use crate::auth::Credential;
use crate::error::{BackupError, BackupResult};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// MIME type Google Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size)";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    /// Drive reports sizes as decimal strings
    #[serde(default)]
    size: Option<String>,
}

impl From<DriveFile> for RemoteEntry {
    fn from(file: DriveFile) -> Self {
        let kind = if file.mime_type == FOLDER_MIME_TYPE {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        RemoteEntry {
            id: file.id,
            name: file.name,
            kind,
            size: file.size.and_then(|s| s.parse().ok()),
        }
    }
}

/// Authorized Drive client
pub struct GoogleDrive {
    http: Client,
    base_url: String,
    access_token: Zeroizing<String>,
}

impl GoogleDrive {
    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        self.http.get(url).bearer_auth(self.access_token.as_str())
    }
}

fn check_status(response: Response, what: &str) -> BackupResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().unwrap_or_default();
    Err(BackupError::Http(format!(
        "{} failed with {}: {}",
        what,
        status,
        detail.trim()
    )))
}

impl RemoteStore for GoogleDrive {
    fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> BackupResult<Page> {
        let query = format!("'{}' in parents", folder_id.replace('\'', "\\'"));
        let mut request = self
            .get(&format!("{}/files", self.base_url))
            .query(&[("q", query.as_str()), ("fields", LIST_FIELDS)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = check_status(request.send()?, "Listing folder")?;
        let list: FileList = response.json()?;
        debug!(
            folder_id,
            count = list.files.len(),
            more = list.next_page_token.is_some(),
            "Listed folder page"
        );

        Ok(Page {
            entries: list.files.into_iter().map(RemoteEntry::from).collect(),
            next_page_token: list.next_page_token,
        })
    }

    fn open(&self, entry: &RemoteEntry) -> BackupResult<Box<dyn Read + '_>> {
        let url = format!("{}/files/{}", self.base_url, entry.id);
        let response = self.get(&url).query(&[("alt", "media")]).send()?;
        let response = check_status(response, "Download")?;
        Ok(Box::new(response))
    }
}

/// Creates `GoogleDrive` clients sharing one HTTP connection pool
pub struct GoogleDriveConnector {
    http: Client,
    base_url: String,
}

impl GoogleDriveConnector {
    pub fn new() -> BackupResult<Self> {
        Self::with_base_url(DRIVE_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> BackupResult<Self> {
        // No overall timeout: large downloads may legitimately take hours
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl Connector for GoogleDriveConnector {
    fn connect(&self, credential: &Credential) -> BackupResult<Box<dyn RemoteStore>> {
        Ok(Box::new(GoogleDrive {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            access_token: Zeroizing::new(credential.access_token.clone()),
        }))
    }
}
