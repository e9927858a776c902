//! Streaming download of a single remote file
//!
//! Content is pulled in fixed-size chunks and written straight to disk;
//! progress is reported after every chunk. No retries happen here, and a
//! failed transfer may leave a partial file behind for the staging wipe to
//! remove.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::info;

use crate::drive::{RemoteEntry, RemoteStore};
use crate::error::{BackupError, BackupResult};

/// Default number of bytes pulled per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Cumulative progress of one download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes: u64,
    pub total: Option<u64>,
    pub done: bool,
}

impl Progress {
    /// Completed percentage, when the total size is known
    pub fn percent(&self) -> Option<u8> {
        if self.done {
            return Some(100);
        }
        match self.total {
            Some(0) | None => None,
            Some(total) => Some(((self.bytes.min(total) * 100) / total) as u8),
        }
    }
}

pub struct Downloader<'a> {
    store: &'a dyn RemoteStore,
    chunk_size: usize,
}

impl<'a> Downloader<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Download `entry` to `local_path`, logging progress
    pub fn download(&self, entry: &RemoteEntry, local_path: &Path) -> BackupResult<u64> {
        info!("Downloading file {}.", local_path.display());
        self.download_with_progress(entry, local_path, &mut |progress| match progress.percent() {
            Some(percent) => info!("Download {}%.", percent),
            None => info!("Downloaded {} bytes.", progress.bytes),
        })
    }

    /// Download `entry` to `local_path`, calling `on_progress` after each chunk
    ///
    /// Returns the number of bytes written.
    pub fn download_with_progress(
        &self,
        entry: &RemoteEntry,
        local_path: &Path,
        on_progress: &mut dyn FnMut(Progress),
    ) -> BackupResult<u64> {
        let file = File::create(local_path).map_err(|e| BackupError::transfer(local_path, e))?;
        let mut writer = BufWriter::new(file);

        let mut reader = self
            .store
            .open(entry)
            .map_err(|e| BackupError::transfer(local_path, e))?;

        let mut buffer = vec![0u8; self.chunk_size];
        let mut bytes = 0u64;
        loop {
            let filled = read_chunk(&mut reader, &mut buffer)
                .map_err(|e| BackupError::transfer(local_path, e))?;
            let done = filled < buffer.len();

            writer
                .write_all(&buffer[..filled])
                .map_err(|e| BackupError::transfer(local_path, e))?;
            bytes += filled as u64;

            on_progress(Progress {
                bytes,
                total: entry.size,
                done,
            });

            if done {
                break;
            }
        }

        writer
            .flush()
            .map_err(|e| BackupError::transfer(local_path, e))?;
        Ok(bytes)
    }
}

/// Fill `buffer` as far as the stream allows; a short count means end of stream
fn read_chunk(reader: &mut dyn Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
