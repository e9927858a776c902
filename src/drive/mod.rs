//! Remote drive access
//!
//! The pipeline sees the cloud drive only through the `RemoteStore`
//! capability: list one page of a folder's children, or open a file's
//! content as a byte stream. `GoogleDrive` implements it over the Drive v3
//! REST API.

mod client;

use std::io::Read;

use crate::auth::Credential;
use crate::error::BackupResult;

pub use client::{GoogleDrive, GoogleDriveConnector, FOLDER_MIME_TYPE};

/// Identifier of the drive root folder
pub const ROOT_FOLDER_ID: &str = "root";

/// Kind of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// One remote node as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    /// Content length in bytes, when the drive reports one
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn file(id: impl Into<String>, name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Folder,
            size: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// One page of a folder listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<RemoteEntry>,
    /// Token for the following page, `None` on the last page
    pub next_page_token: Option<String>,
}

/// Listing and download capability of a remote drive
pub trait RemoteStore {
    /// List one page of the direct children of `folder_id`
    fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> BackupResult<Page>;

    /// Open the content of a file for streaming
    fn open(&self, entry: &RemoteEntry) -> BackupResult<Box<dyn Read + '_>>;
}

/// Builds an authorized `RemoteStore` from a credential
pub trait Connector {
    fn connect(&self, credential: &Credential) -> BackupResult<Box<dyn RemoteStore>>;
}
