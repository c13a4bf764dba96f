// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Store facade: save, get, list and delete encrypted objects.
//!
//! ## Consistency
//!
//! Save writes the blob durably before the descriptor, so the ledger never
//! lists an object whose blob is missing. A crash between the two writes
//! leaves an unlisted blob, reported by [`FileStore::find_orphans`].
//! Delete removes the descriptor first for the same reason.
//!
//! ## Concurrency
//!
//! The store holds no in-process lock; the filesystem is the only
//! synchronization point. Operations on different ids are independent.
//! Operations on the same id race: a get concurrent with a delete may
//! succeed or return `NotFound`. All methods block on file I/O and should
//! be driven from a blocking-capable context.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, warn};

use super::envelope::{EncryptionKey, EnvelopeCipher};
use super::error::{DeleteReport, Removal};
use super::{
    DiskStorage, IdPolicy, MetadataLedger, ObjectDescriptor, StorageId, StoragePaths, StoreError,
    StoreResult,
};

/// Everything the store needs at construction.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub key: EncryptionKey,
    pub id_policy: IdPolicy,
}

impl StoreConfig {
    pub fn new(root: impl AsRef<Path>, key: EncryptionKey) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            key,
            id_policy: IdPolicy::default(),
        }
    }

    /// Build a config from a hex key; a malformed key is a `Configuration`
    /// error.
    pub fn from_hex(root: impl AsRef<Path>, key_hex: &str) -> StoreResult<Self> {
        Ok(Self::new(root, EncryptionKey::from_hex(key_hex)?))
    }

    pub fn with_id_policy(mut self, id_policy: IdPolicy) -> Self {
        self.id_policy = id_policy;
        self
    }
}

/// Encrypted object store over a single directory.
#[derive(Debug)]
pub struct FileStore {
    disk: DiskStorage,
    cipher: EnvelopeCipher,
    id_policy: IdPolicy,
}

impl FileStore {
    /// Open the store, creating its directory layout.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let disk = DiskStorage::open(StoragePaths::new(&config.root))?;
        debug!(root = %config.root.display(), id_policy = ?config.id_policy, "object store opened");
        Ok(Self {
            disk,
            cipher: EnvelopeCipher::new(&config.key),
            id_policy: config.id_policy,
        })
    }

    pub fn paths(&self) -> &StoragePaths {
        self.disk.paths()
    }

    fn ledger(&self) -> MetadataLedger<'_> {
        MetadataLedger::new(&self.disk)
    }

    /// Encrypt and persist `plaintext`, returning its descriptor.
    pub fn save(
        &self,
        plaintext: &[u8],
        original_name: &str,
        mimetype: &str,
    ) -> StoreResult<ObjectDescriptor> {
        self.save_at(plaintext, original_name, mimetype, Utc::now())
    }

    /// [`save`](Self::save) with an explicit upload instant. The instant is
    /// truncated to milliseconds and used for both the id and the
    /// descriptor.
    pub fn save_at(
        &self,
        plaintext: &[u8],
        original_name: &str,
        mimetype: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<ObjectDescriptor> {
        let at = at.trunc_subsecs(3);
        let id = self.id_policy.generate(original_name, at);
        let ledger = self.ledger();

        if ledger.exists(&id) {
            warn!(%id, "storage id already in use, overwriting existing object");
        }

        let sealed = self.cipher.seal(plaintext)?;
        self.disk.write_atomic(self.paths().blob(&id), &sealed)?;

        let descriptor = ObjectDescriptor {
            original_name: original_name.to_string(),
            id,
            size: plaintext.len() as u64,
            mimetype: mimetype.to_string(),
            upload_date: at,
        };
        if let Err(e) = ledger.put(&descriptor) {
            warn!(id = %descriptor.id, error = %e, "descriptor write failed, blob left orphaned");
            return Err(e);
        }

        debug!(id = %descriptor.id, size = descriptor.size, "stored object");
        Ok(descriptor)
    }

    /// Load, verify and decrypt an object.
    pub fn get(&self, id: &str) -> StoreResult<(Vec<u8>, ObjectDescriptor)> {
        let id = StorageId::parse(id)?;
        let descriptor = self.ledger().get(&id)?;

        let sealed = self
            .disk
            .read_raw(self.paths().blob(&id))
            .map_err(|e| match e {
                StoreError::NotFound(_) => StoreError::NotFound(format!("Blob {id}")),
                other => other,
            })?;

        let plaintext = self.cipher.open(&sealed).inspect_err(|e| {
            warn!(%id, error = %e, "blob failed authentication");
        })?;

        if plaintext.len() as u64 != descriptor.size {
            return Err(StoreError::CorruptMetadata {
                id: id.to_string(),
                reason: format!(
                    "descriptor size {} does not match blob size {}",
                    descriptor.size,
                    plaintext.len()
                ),
            });
        }

        Ok((plaintext, descriptor))
    }

    /// Snapshot of all descriptors, oldest upload first.
    pub fn list(&self) -> StoreResult<Vec<ObjectDescriptor>> {
        let mut descriptors = self.ledger().list()?;
        descriptors.sort_by(|a, b| {
            a.upload_date
                .cmp(&b.upload_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(descriptors)
    }

    /// Remove both files of an object.
    ///
    /// Both removals are always attempted. Returns `NotFound` when neither
    /// existed and `PartialDelete` when either failed.
    pub fn delete(&self, id: &str) -> StoreResult<DeleteReport> {
        let id = StorageId::parse(id)?;

        let descriptor = Removal::from_result(self.ledger().remove(&id));
        let blob = Removal::from_result(self.disk.delete(self.paths().blob(&id)));

        let report = DeleteReport {
            id: id.to_string(),
            blob,
            descriptor,
        };
        match report.into_result() {
            Ok(report) => {
                if report.is_complete() {
                    debug!(%id, "deleted object");
                } else {
                    warn!(%report, "deleted incomplete object");
                }
                Ok(report)
            }
            Err(StoreError::PartialDelete(report)) => {
                warn!(%report, "delete failed part way");
                Err(StoreError::PartialDelete(report))
            }
            Err(e) => Err(e),
        }
    }

    /// Ids that have a blob but no descriptor.
    pub fn find_orphans(&self) -> StoreResult<Vec<StorageId>> {
        let ledger = self.ledger();
        let mut orphans: Vec<StorageId> = self
            .disk
            .list_names()?
            .iter()
            .filter_map(|name| StorageId::parse(name).ok())
            .filter(|id| !ledger.exists(id))
            .collect();
        orphans.sort();
        Ok(orphans)
    }

    /// Write/read/delete probe of the storage root.
    pub fn health_check(&self) -> StoreResult<()> {
        self.disk.health_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::identifier;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    const HEX_KEY: &str = "8f2a6c1d9e4b7a3f0c5d8e1b2a4f6c9d7e0a3b5c8d1f4e6a9b2c5d7e0f3a6b8c";

    fn test_store() -> (TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::from_hex(dir.path().join("uploads"), HEX_KEY).unwrap();
        let store = FileStore::open(config).expect("Failed to open store");
        (dir, store)
    }

    fn instant(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn save_then_get_hello_world() {
        let (_dir, store) = test_store();

        let saved = store.save(b"hello world", "a.txt", "text/plain").unwrap();
        assert_eq!(saved.size, 11);
        assert_eq!(saved.original_name, "a.txt");
        assert_eq!(saved.mimetype, "text/plain");

        let (data, descriptor) = store.get(saved.id.as_str()).unwrap();
        assert_eq!(data, b"hello world");
        assert_eq!(descriptor, saved);
    }

    #[test]
    fn empty_buffer_roundtrips() {
        let (_dir, store) = test_store();

        let saved = store.save(b"", "empty.bin", "application/octet-stream").unwrap();
        assert_eq!(saved.size, 0);

        let (data, descriptor) = store.get(saved.id.as_str()).unwrap();
        assert!(data.is_empty());
        assert_eq!(descriptor.size, 0);
    }

    #[test]
    fn blob_on_disk_is_ciphertext_envelope() {
        let (_dir, store) = test_store();
        let saved = store.save(b"hello world", "a.txt", "text/plain").unwrap();

        let on_disk = fs::read(store.paths().blob(&saved.id)).unwrap();
        assert_eq!(on_disk.len(), 32 + 11);
        assert!(!on_disk.windows(11).any(|w| w == b"hello world"));
        assert!(store.paths().meta(&saved.id).is_file());
    }

    #[test]
    fn save_at_is_deterministic_and_millisecond_precise() {
        let (_dir, store) = test_store();
        let at = Utc.timestamp_nanos(1_706_400_000_123_456_789);

        let saved = store.save_at(b"x", "a.txt", "text/plain", at).unwrap();
        assert_eq!(saved.upload_date, instant(1_706_400_000_123));
        assert_eq!(saved.id, identifier::generate("a.txt", instant(1_706_400_000_123)));
    }

    #[test]
    fn same_name_same_tick_overwrites() {
        let (_dir, store) = test_store();
        let at = instant(1_706_400_000_000);

        let first = store.save_at(b"first", "a.txt", "text/plain", at).unwrap();
        let second = store.save_at(b"second!", "a.txt", "text/plain", at).unwrap();
        assert_eq!(first.id, second.id);

        let (data, descriptor) = store.get(first.id.as_str()).unwrap();
        assert_eq!(data, b"second!");
        assert_eq!(descriptor.size, 7);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn salted_policy_keeps_both_objects() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::from_hex(dir.path(), HEX_KEY)
            .unwrap()
            .with_id_policy(IdPolicy::Salted);
        let store = FileStore::open(config).unwrap();
        let at = instant(1_706_400_000_000);

        let first = store.save_at(b"first", "a.txt", "text/plain", at).unwrap();
        let second = store.save_at(b"second", "a.txt", "text/plain", at).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let (_dir, store) = test_store();
        let saved = store.save(b"bye", "b.txt", "text/plain").unwrap();

        let report = store.delete(saved.id.as_str()).unwrap();
        assert!(report.is_complete());

        assert!(matches!(
            store.get(saved.id.as_str()),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn delete_reports_failure_on_either_half() {
        let (_dir, store) = test_store();
        let saved = store.save(b"stuck", "s.txt", "text/plain").unwrap();
        let blob = store.paths().blob(&saved.id);
        fs::remove_file(&blob).unwrap();
        fs::create_dir(&blob).unwrap();

        let Err(StoreError::PartialDelete(report)) = store.delete(saved.id.as_str()) else {
            panic!("expected a partial delete");
        };
        assert!(matches!(report.descriptor, Removal::Removed));
        assert!(matches!(report.blob, Removal::Failed(StoreError::Io(_))));
        assert!(!store.paths().meta(&saved.id).exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn unreadable_descriptor_is_io_error() {
        let (_dir, store) = test_store();
        let saved = store.save(b"data", "d.txt", "text/plain").unwrap();
        let meta = store.paths().meta(&saved.id);
        fs::remove_file(&meta).unwrap();
        fs::create_dir(&meta).unwrap();

        let result = store.get(saved.id.as_str());
        assert!(matches!(result, Err(StoreError::Io(_))), "{result:?}");
    }

    #[test]
    fn delete_of_nothing_is_not_found() {
        let (_dir, store) = test_store();
        let id = identifier::generate("ghost", instant(0));
        assert!(matches!(
            store.delete(id.as_str()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn malformed_ids_are_not_found() {
        let (_dir, store) = test_store();
        for id in ["../../etc/passwd", "", "ABC", ".staging"] {
            assert!(matches!(store.get(id), Err(StoreError::NotFound(_))));
            assert!(matches!(store.delete(id), Err(StoreError::NotFound(_))));
        }
    }

    #[test]
    fn missing_blob_is_not_found() {
        let (_dir, store) = test_store();
        let saved = store.save(b"data", "c.txt", "text/plain").unwrap();
        fs::remove_file(store.paths().blob(&saved.id)).unwrap();

        assert!(matches!(
            store.get(saved.id.as_str()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn tampered_blob_is_integrity_error() {
        let (_dir, store) = test_store();
        let saved = store.save(b"hello world", "a.txt", "text/plain").unwrap();
        let blob_path = store.paths().blob(&saved.id);

        let mut bytes = fs::read(&blob_path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        fs::write(&blob_path, bytes).unwrap();

        assert!(matches!(
            store.get(saved.id.as_str()),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn wrong_key_cannot_read_existing_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(StoreConfig::from_hex(dir.path(), HEX_KEY).unwrap()).unwrap();
        let saved = store.save(b"secret", "s.txt", "text/plain").unwrap();

        let other = FileStore::open(StoreConfig::new(dir.path(), EncryptionKey::generate())).unwrap();
        assert!(matches!(
            other.get(saved.id.as_str()),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn size_mismatch_is_corrupt_metadata() {
        let (_dir, store) = test_store();
        let saved = store.save(b"hello world", "a.txt", "text/plain").unwrap();

        let mut lying = saved.clone();
        lying.size = 3;
        MetadataLedger::new(&store.disk).put(&lying).unwrap();

        assert!(matches!(
            store.get(saved.id.as_str()),
            Err(StoreError::CorruptMetadata { .. })
        ));
    }

    #[test]
    fn orphaned_blob_is_detected_unlisted_and_deletable() {
        let (_dir, store) = test_store();
        let kept = store.save(b"kept", "k.txt", "text/plain").unwrap();
        let orphan = store.save(b"orphan", "o.txt", "text/plain").unwrap();
        fs::remove_file(store.paths().meta(&orphan.id)).unwrap();

        assert_eq!(store.find_orphans().unwrap(), vec![orphan.id.clone()]);
        let listed: Vec<_> = store.list().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(listed, vec![kept.id]);
        assert!(matches!(
            store.get(orphan.id.as_str()),
            Err(StoreError::NotFound(_))
        ));

        let report = store.delete(orphan.id.as_str()).unwrap();
        assert!(matches!(report.blob, Removal::Removed));
        assert!(matches!(report.descriptor, Removal::Missing));
        assert!(store.find_orphans().unwrap().is_empty());
    }

    #[test]
    fn list_is_sorted_by_upload_time() {
        let (_dir, store) = test_store();
        for (name, millis) in [("c", 3_000), ("a", 1_000), ("b", 2_000)] {
            store
                .save_at(name.as_bytes(), name, "text/plain", instant(millis))
                .unwrap();
        }

        let names: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|d| d.original_name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn concurrent_saves_of_distinct_names() {
        let (_dir, store) = test_store();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    let body = format!("payload {i}");
                    store
                        .save(body.as_bytes(), &format!("file-{i}.txt"), "text/plain")
                        .unwrap();
                });
            }
        });

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 8);
        for descriptor in listed {
            let (data, _) = store.get(descriptor.id.as_str()).unwrap();
            assert_eq!(data.len() as u64, descriptor.size);
        }
    }

    #[test]
    fn short_key_refuses_to_build_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = StoreConfig::from_hex(dir.path().join("never"), &"00".repeat(16));
        assert!(matches!(result, Err(StoreError::Configuration(_))));
        assert!(!dir.path().join("never").exists());
    }

    #[test]
    fn unusable_root_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("occupied");
        fs::write(&root, b"a file, not a directory").unwrap();

        let result = FileStore::open(StoreConfig::from_hex(&root, HEX_KEY).unwrap());
        assert!(matches!(result, Err(StoreError::Configuration(_))));
    }

    #[test]
    fn health_check_passes_on_fresh_store() {
        let (_dir, store) = test_store();
        store.health_check().unwrap();
    }
}
