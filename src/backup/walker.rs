//! Remote tree traversal
//!
//! Walks the remote tree depth-first with an explicit work stack of
//! (folder id, local directory) pairs, mirroring folders into the staging
//! directory and downloading every file exactly once. A file that fails to
//! download is recorded in the skip list and the walk moves on; only listing
//! and directory-creation failures abort the walk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::downloader::Downloader;
use super::sanitize::sanitize_filename;
use crate::drive::{RemoteEntry, RemoteStore};
use crate::error::{BackupError, BackupResult};

/// Local paths whose download failed, in the order they were attempted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList(Vec<PathBuf>);

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) {
        self.0.push(path);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.0
    }
}

/// Counters for one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub skipped: SkipList,
    pub files_attempted: usize,
    pub folders_created: usize,
    pub bytes_downloaded: u64,
}

pub struct TreeWalker<'a> {
    store: &'a dyn RemoteStore,
    downloader: Downloader<'a>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            downloader: Downloader::new(store),
        }
    }

    pub fn with_downloader(mut self, downloader: Downloader<'a>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Mirror `remote_root` into `local_root`, returning the files that failed
    pub fn walk(&self, remote_root: &str, local_root: &Path) -> BackupResult<SkipList> {
        self.walk_with_summary(remote_root, local_root)
            .map(|summary| summary.skipped)
    }

    pub fn walk_with_summary(
        &self,
        remote_root: &str,
        local_root: &Path,
    ) -> BackupResult<WalkSummary> {
        let mut summary = WalkSummary::default();
        let mut pending = vec![(remote_root.to_string(), local_root.to_path_buf())];

        while let Some((folder_id, folder_path)) = pending.pop() {
            ensure_dir(&folder_path)?;

            let mut page_token: Option<String> = None;
            loop {
                let page = self
                    .store
                    .list_children(&folder_id, page_token.as_deref())
                    .map_err(|e| {
                        BackupError::Pipeline(format!(
                            "Failed to list {}: {}",
                            folder_path.display(),
                            e
                        ))
                    })?;

                for entry in &page.entries {
                    let local_path = folder_path.join(local_name(&entry.name));
                    if entry.is_folder() {
                        ensure_dir(&local_path)?;
                        summary.folders_created += 1;
                        pending.push((entry.id.clone(), local_path));
                    } else {
                        self.fetch(entry, local_path, &mut summary);
                    }
                }

                page_token = page.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }
        }

        info!(
            files = summary.files_attempted,
            folders = summary.folders_created,
            skipped = summary.skipped.len(),
            bytes = summary.bytes_downloaded,
            "Remote tree walk finished"
        );
        Ok(summary)
    }

    fn fetch(&self, entry: &RemoteEntry, local_path: PathBuf, summary: &mut WalkSummary) {
        summary.files_attempted += 1;
        match self.downloader.download(entry, &local_path) {
            Ok(bytes) => {
                debug!(path = %local_path.display(), bytes, "Downloaded");
                summary.bytes_downloaded += bytes;
            }
            Err(e) => {
                warn!(
                    "Error downloading file {}. Error: {}. Skipping this file.",
                    local_path.display(),
                    e
                );
                summary.skipped.push(local_path);
            }
        }
    }
}

/// Sanitized local name for a remote entry
///
/// `.` and `..` would resolve outside the entry's folder, so they are
/// replaced with underscores.
fn local_name(remote_name: &str) -> String {
    let name = sanitize_filename(remote_name);
    match name.as_str() {
        "." => "_".to_string(),
        ".." => "__".to_string(),
        _ => name,
    }
}

fn ensure_dir(path: &Path) -> BackupResult<()> {
    fs::create_dir_all(path).map_err(|e| {
        BackupError::Pipeline(format!(
            "Failed to create directory {}: {}",
            path.display(),
            e
        ))
    })
}
