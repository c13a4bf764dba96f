// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable filesystem operations for the object store.
//!
//! Every write goes to a uniquely named file under `.staging/`, is flushed
//! with `sync_all`, and is then renamed over its final path. Readers therefore
//! see either the previous file or the complete new one, never a torn write.
//! Staging leftovers from a crash are removed on the next open.
//!
//! This module knows nothing about encryption or descriptors; it moves bytes
//! and JSON documents and translates I/O failures into [`StoreError`].

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::paths::STAGING_SUFFIX;
use super::{StoragePaths, StoreError, StoreResult};

/// Filesystem access rooted at a [`StoragePaths`].
#[derive(Debug, Clone)]
pub struct DiskStorage {
    paths: StoragePaths,
}

impl DiskStorage {
    /// Open storage at `paths`, creating the directory layout if needed.
    ///
    /// Safe to call repeatedly. Removes orphaned staging files.
    pub fn open(paths: StoragePaths) -> StoreResult<Self> {
        fs::create_dir_all(paths.root()).map_err(|e| {
            StoreError::Configuration(format!(
                "cannot create storage root {}: {e}",
                paths.root().display()
            ))
        })?;
        fs::create_dir_all(paths.staging_dir())?;
        restrict_dir_permissions(paths.root());

        let storage = Self { paths };
        storage.cleanup_staging();
        Ok(storage)
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Write-read-delete probe under the staging directory.
    ///
    /// Each call uses its own probe file, so overlapping checks never see
    /// each other's writes.
    pub fn health_check(&self) -> StoreResult<()> {
        let probe = self.paths.health_probe(Uuid::new_v4());
        let data = b"health_check_data";

        fs::write(&probe, data)?;
        let read_back = fs::read(&probe);
        let removed = fs::remove_file(&probe);
        let read_back = read_back?;
        removed?;

        if read_back != data {
            return Err(StoreError::Integrity(
                "health check data mismatch".to_string(),
            ));
        }
        Ok(())
    }

    // ========== JSON Documents ==========

    /// Read a JSON file and deserialize it.
    ///
    /// Filesystem failures surface as I/O errors; only undecodable content is
    /// reported as corrupt metadata.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StoreResult<T> {
        let path = path.as_ref();
        let bytes = self.read_raw(path)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::CorruptMetadata {
            id: file_label(path),
            reason: e.to_string(),
        })
    }

    /// Serialize `value` as compact JSON and write it atomically.
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::CorruptMetadata {
            id: file_label(path.as_ref()),
            reason: e.to_string(),
        })?;
        self.write_atomic(path, &bytes)
    }

    // ========== Raw Files ==========

    /// Durably replace `path` with `data`.
    pub fn write_atomic(&self, path: impl AsRef<Path>, data: &[u8]) -> StoreResult<()> {
        let path = path.as_ref();
        let staging_dir = self.paths.staging_dir();
        let staging_path = staging_dir.join(format!("{}{STAGING_SUFFIX}", Uuid::new_v4()));

        let written = (|| -> StoreResult<()> {
            let file = File::create(&staging_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(data)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            fs::rename(&staging_path, path)?;
            Ok(())
        })();

        if let Err(e) = written {
            // Leftovers are swept on the next open if this also fails.
            let _ = fs::remove_file(&staging_path);
            return Err(e);
        }

        if let Some(parent) = path.parent() {
            fsync_dir(parent)?;
        }
        Ok(())
    }

    /// Read a whole file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StoreResult<Vec<u8>> {
        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Delete a file. A missing file is reported as `NotFound`.
    pub fn delete(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        fs::remove_file(path.as_ref())?;
        Ok(())
    }

    /// File names directly under the root, skipping directories.
    pub fn list_names(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.paths.root())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Stems of files under the root with the given extension.
    pub fn list_files(&self, extension: &str) -> StoreResult<Vec<String>> {
        let suffix = format!(".{extension}");
        Ok(self
            .list_names()?
            .into_iter()
            .filter_map(|name| name.strip_suffix(&suffix).map(str::to_string))
            .collect())
    }

    /// Remove any leftover staging files from a previous crash.
    fn cleanup_staging(&self) {
        let Ok(entries) = fs::read_dir(self.paths.staging_dir()) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().ends_with(STAGING_SUFFIX) {
                warn!(path = %entry.path().display(), "removing orphaned staging file");
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn restrict_dir_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o700)) {
            warn!("cannot restrict permissions on {}: {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

fn fsync_dir(path: &Path) -> StoreResult<()> {
    #[cfg(unix)]
    {
        let dir = fs::OpenOptions::new().read(true).open(path)?;
        dir.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
