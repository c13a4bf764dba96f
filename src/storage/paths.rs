// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the object store layout.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::StorageId;

/// Default storage root, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

/// Extension of descriptor files (`<id>.meta`).
pub const META_EXTENSION: &str = "meta";

/// Subdirectory holding in-flight writes before they are renamed into place.
pub const STAGING_DIR: &str = ".staging";

/// Suffix of in-flight staging files.
pub const STAGING_SUFFIX: &str = ".staging";

/// Storage path utilities for the object store.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_DIR)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory holding blobs and descriptors.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encrypted blob for an object.
    pub fn blob(&self, id: &StorageId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Descriptor file for an object.
    pub fn meta(&self, id: &StorageId) -> PathBuf {
        self.root.join(format!("{id}.{META_EXTENSION}"))
    }

    /// Directory for staged writes. Lives under the root so renames stay on
    /// one filesystem.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Probe file for one run of the storage health check.
    pub fn health_probe(&self, nonce: Uuid) -> PathBuf {
        self.staging_dir().join(format!(".health_check-{nonce}{STAGING_SUFFIX}"))
    }
}
