//! Packaging the staging directory into one zip archive
//!
//! Every regular file below the staging directory is stored deflated under
//! its base name only, so the archive is flat. When two files share a base
//! name, later ones get a numbered suffix (`name (2).ext`) instead of
//! shadowing the first.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::paths::archive_path;
use crate::error::{BackupError, BackupResult};

/// A finished archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub file_count: usize,
}

/// Zip `source_dir` into `<base_path>.zip`
///
/// The archive is written to a temporary file beside the target and renamed
/// into place once flushed and closed, so a failed run never leaves a
/// truncated `.zip` behind.
pub fn archive(source_dir: &Path, base_path: &Path) -> BackupResult<ArchiveArtifact> {
    info!("Zipping process started.");
    let path = archive_path(base_path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                BackupError::Archive(format!(
                    "Failed to create archive directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let temp_path = path.with_extension("zip.tmp");
    let file_count = match write_zip(source_dir, &temp_path) {
        Ok(count) => count,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    fs::rename(&temp_path, &path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        BackupError::Archive(format!("Failed to move archive into place: {}", e))
    })?;

    let size_bytes = fs::metadata(&path)
        .map_err(|e| BackupError::Archive(format!("Failed to stat {}: {}", path.display(), e)))?
        .len();

    info!(files = file_count, bytes = size_bytes, "Zipping process ends.");
    Ok(ArchiveArtifact {
        path,
        size_bytes,
        file_count,
    })
}

/// Write every file below `source_dir` into a new zip at `target`
fn write_zip(source_dir: &Path, target: &Path) -> BackupResult<usize> {
    let file = File::create(target).map_err(|e| {
        BackupError::Archive(format!("Failed to create {}: {}", target.display(), e))
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let mut used_names = HashSet::new();
    let mut file_count = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            BackupError::Archive(format!("Failed to walk staging directory: {}", e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let base_name = entry.file_name().to_string_lossy().into_owned();
        let name = unique_name(&base_name, &mut used_names);
        if name != base_name {
            warn!(
                path = %entry.path().display(),
                stored_as = %name,
                "Duplicate file name in archive"
            );
        }

        let mut source = BufReader::new(File::open(entry.path()).map_err(|e| {
            BackupError::Archive(format!("Failed to open {}: {}", entry.path().display(), e))
        })?);
        zip.start_file(name, options)?;
        io::copy(&mut source, &mut zip).map_err(|e| {
            BackupError::Archive(format!("Failed to add {}: {}", entry.path().display(), e))
        })?;
        file_count += 1;
    }

    let mut writer = zip.finish()?;
    writer
        .flush()
        .map_err(|e| BackupError::Archive(format!("Failed to flush archive: {}", e)))?;

    Ok(file_count)
}

/// First free name among `name`, `name (2)`, `name (3)`, ...
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn names_in(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_archive_is_flat() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("folder1").join("nested")).unwrap();
        fs::create_dir_all(staging.join("empty")).unwrap();
        fs::write(staging.join("fileA"), b"A contents").unwrap();
        fs::write(staging.join("folder1").join("nested").join("fileB"), b"B contents").unwrap();

        let artifact = archive(&staging, &temp.path().join("out").join("2024-01-01_00-00-00")).unwrap();

        assert_eq!(artifact.path, temp.path().join("out").join("2024-01-01_00-00-00.zip"));
        assert_eq!(artifact.file_count, 2);
        assert_eq!(artifact.size_bytes, fs::metadata(&artifact.path).unwrap().len());
        assert_eq!(names_in(&artifact.path), vec!["fileA", "fileB"]);

        let mut archive = ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        let mut contents = String::new();
        archive.by_name("fileB").unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "B contents");
        assert_eq!(
            archive.by_name("fileA").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn test_colliding_base_names_are_kept() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("a")).unwrap();
        fs::create_dir_all(staging.join("b")).unwrap();
        fs::write(staging.join("a").join("notes.txt"), b"first").unwrap();
        fs::write(staging.join("b").join("notes.txt"), b"second").unwrap();

        let artifact = archive(&staging, &temp.path().join("backup")).unwrap();
        assert_eq!(names_in(&artifact.path), vec!["notes (2).txt", "notes.txt"]);
    }

    #[test]
    fn test_empty_staging_produces_empty_archive() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging).unwrap();

        let artifact = archive(&staging, &temp.path().join("backup")).unwrap();
        assert_eq!(artifact.file_count, 0);
        assert!(names_in(&artifact.path).is_empty());
    }

    #[test]
    fn test_failed_archive_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let base = out.join("2024-01-01_00-00-00");

        let err = archive(&temp.path().join("missing-staging"), &base).unwrap_err();

        assert!(matches!(err, BackupError::Archive(_)));
        assert!(!archive_path(&base).exists());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_unique_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("a.tar.gz", &mut used), "a.tar.gz");
        assert_eq!(unique_name("a.tar.gz", &mut used), "a.tar (2).gz");
        assert_eq!(unique_name("a.tar.gz", &mut used), "a.tar (3).gz");
        assert_eq!(unique_name(".bashrc", &mut used), ".bashrc");
        assert_eq!(unique_name(".bashrc", &mut used), ".bashrc (2)");
        assert_eq!(unique_name("README", &mut used), "README");
        assert_eq!(unique_name("README", &mut used), "README (2)");
    }
}
