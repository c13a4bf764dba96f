// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Metadata ledger: one compact JSON descriptor per object.
//!
//! Descriptors live next to their blobs as `<id>.meta`:
//!
//! ```json
//! {"originalName":"a.txt","hashedName":"<id>","size":11,"mimetype":"text/plain","uploadDate":"2026-01-28T00:00:00.000Z"}
//! ```
//!
//! Records are decoded into a validated [`ObjectDescriptor`]. A record that
//! fails to decode, or whose `hashedName` does not match its file name, is
//! reported as [`StoreError::CorruptMetadata`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use super::paths::META_EXTENSION;
use super::{DiskStorage, StorageId, StoreError, StoreResult};

/// Descriptor of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    /// Name supplied at upload. Never used as a path.
    pub original_name: String,
    /// Storage id; serialized as `hashedName` for compatibility.
    #[serde(rename = "hashedName")]
    pub id: StorageId,
    /// Plaintext length in bytes.
    pub size: u64,
    pub mimetype: String,
    /// Upload instant, millisecond precision.
    #[serde(serialize_with = "serialize_millis")]
    pub upload_date: DateTime<Utc>,
}

fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Record shape as found on disk, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorRecord {
    original_name: String,
    #[serde(alias = "id")]
    hashed_name: String,
    size: u64,
    mimetype: String,
    upload_date: String,
}

impl DescriptorRecord {
    fn validate(self, expected: &StorageId) -> Result<ObjectDescriptor, String> {
        let id = StorageId::parse(&self.hashed_name)
            .map_err(|_| "hashedName is not a valid storage id".to_string())?;
        if &id != expected {
            return Err(format!("hashedName {id} does not match file name"));
        }
        let upload_date = DateTime::parse_from_rfc3339(&self.upload_date)
            .map_err(|e| format!("uploadDate is not ISO-8601: {e}"))?
            .with_timezone(&Utc);

        Ok(ObjectDescriptor {
            original_name: self.original_name,
            id,
            size: self.size,
            mimetype: self.mimetype,
            upload_date,
        })
    }
}

/// Repository for descriptor files.
pub struct MetadataLedger<'a> {
    disk: &'a DiskStorage,
}

impl<'a> MetadataLedger<'a> {
    pub fn new(disk: &'a DiskStorage) -> Self {
        Self { disk }
    }

    /// Check if a descriptor exists.
    pub fn exists(&self, id: &StorageId) -> bool {
        self.disk.exists(self.disk.paths().meta(id))
    }

    /// Write (or overwrite) the descriptor, keyed by its own id.
    pub fn put(&self, descriptor: &ObjectDescriptor) -> StoreResult<()> {
        self.disk
            .write_json(self.disk.paths().meta(&descriptor.id), descriptor)
    }

    /// Load and validate the descriptor for `id`.
    pub fn get(&self, id: &StorageId) -> StoreResult<ObjectDescriptor> {
        let record: DescriptorRecord = match self.disk.read_json(self.disk.paths().meta(id)) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                return Err(StoreError::NotFound(format!("Descriptor {id}")));
            }
            Err(StoreError::CorruptMetadata { reason, .. }) => {
                return Err(StoreError::CorruptMetadata {
                    id: id.to_string(),
                    reason,
                });
            }
            Err(e) => return Err(e),
        };

        record
            .validate(id)
            .map_err(|reason| StoreError::CorruptMetadata {
                id: id.to_string(),
                reason,
            })
    }

    /// Ids of every descriptor file whose stem is a well-formed id.
    pub fn ids(&self) -> StoreResult<Vec<StorageId>> {
        Ok(self
            .disk
            .list_files(META_EXTENSION)?
            .into_iter()
            .filter_map(|stem| StorageId::parse(&stem).ok())
            .collect())
    }

    /// Every readable descriptor, in directory order.
    ///
    /// Corrupt records are skipped with a warning. Records removed between
    /// the directory scan and the read are skipped silently.
    pub fn list(&self) -> StoreResult<Vec<ObjectDescriptor>> {
        let mut descriptors = Vec::new();
        for id in self.ids()? {
            match self.get(&id) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(StoreError::NotFound(_)) => {}
                Err(StoreError::CorruptMetadata { id, reason }) => {
                    warn!(%id, %reason, "skipping corrupt descriptor");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(descriptors)
    }

    /// Delete the descriptor. Absence is reported as `NotFound`.
    pub fn remove(&self, id: &StorageId) -> StoreResult<()> {
        match self.disk.delete(self.disk.paths().meta(id)) {
            Err(StoreError::NotFound(_)) => Err(StoreError::NotFound(format!("Descriptor {id}"))),
            other => other,
        }
    }
}
