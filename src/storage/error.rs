// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the encrypted object store.
//!
//! Lower layers (disk, envelope, ledger) return these errors directly so the
//! facade never has to interpret raw I/O or cipher failures itself.

use std::fmt;
use std::io;

/// Errors returned by every storage operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Invalid or missing configuration (bad key, unusable root directory).
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No blob or no descriptor exists for the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Envelope failed authentication (tampering, corruption or wrong key).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The cipher refused to seal a plaintext (message length limit).
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A descriptor file exists but does not decode to a valid descriptor.
    #[error("corrupt metadata for {id}: {reason}")]
    CorruptMetadata { id: String, reason: String },

    /// Underlying filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// Delete removed some parts of an object but failed on others.
    #[error("partial delete: {0}")]
    PartialDelete(Box<DeleteReport>),
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(e.to_string())
        } else {
            StoreError::Io(e)
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// What happened to one half (blob or descriptor) of an object on delete.
#[derive(Debug)]
pub enum Removal {
    Removed,
    Missing,
    Failed(StoreError),
}

impl Removal {
    pub(crate) fn from_result(result: StoreResult<()>) -> Self {
        match result {
            Ok(()) => Removal::Removed,
            Err(e) if e.is_not_found() => Removal::Missing,
            Err(e) => Removal::Failed(e),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Removal::Failed(_))
    }
}

impl fmt::Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Removal::Removed => write!(f, "removed"),
            Removal::Missing => write!(f, "missing"),
            Removal::Failed(e) => write!(f, "failed ({e})"),
        }
    }
}

/// Outcome of a delete, one entry per file making up the object.
#[derive(Debug)]
pub struct DeleteReport {
    pub id: String,
    pub blob: Removal,
    pub descriptor: Removal,
}

impl DeleteReport {
    /// Classify the report.
    ///
    /// - any removal failed: `PartialDelete` carrying both outcomes
    /// - nothing existed: `NotFound`
    /// - otherwise the report itself, so callers can still see that an
    ///   orphaned blob (descriptor already `Missing`) was cleaned up
    pub fn into_result(self) -> StoreResult<DeleteReport> {
        if self.blob.is_failed() || self.descriptor.is_failed() {
            return Err(StoreError::PartialDelete(Box::new(self)));
        }
        if matches!(
            (&self.blob, &self.descriptor),
            (Removal::Missing, Removal::Missing)
        ) {
            return Err(StoreError::NotFound(format!("Object {}", self.id)));
        }
        Ok(self)
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            (&self.blob, &self.descriptor),
            (Removal::Removed, Removal::Removed)
        )
    }
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object {}: blob {}, descriptor {}",
            self.id, self.blob, self.descriptor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(blob: Removal, descriptor: Removal) -> DeleteReport {
        DeleteReport {
            id: "abc".to_string(),
            blob,
            descriptor,
        }
    }

    #[test]
    fn seal_failures_are_not_io_errors() {
        let err = StoreError::Encryption("plaintext exceeds the AES-GCM message limit".into());
        assert!(!matches!(err, StoreError::Io(_)));
        assert_eq!(
            err.to_string(),
            "encryption failed: plaintext exceeds the AES-GCM message limit"
        );
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: StoreError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_not_found());

        let err: StoreError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn full_delete_is_ok_and_complete() {
        let report = report(Removal::Removed, Removal::Removed)
            .into_result()
            .unwrap();
        assert!(report.is_complete());
    }

    #[test]
    fn nothing_existed_is_not_found() {
        let result = report(Removal::Missing, Removal::Missing).into_result();
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn orphan_blob_cleanup_is_ok_but_incomplete() {
        let report = report(Removal::Removed, Removal::Missing)
            .into_result()
            .unwrap();
        assert!(!report.is_complete());
    }

    #[test]
    fn any_failure_is_partial_and_keeps_both_outcomes() {
        let failure = StoreError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let result = report(Removal::Removed, Removal::Failed(failure)).into_result();

        match result {
            Err(StoreError::PartialDelete(report)) => {
                assert!(matches!(report.blob, Removal::Removed));
                assert!(report.descriptor.is_failed());
                assert!(report.to_string().contains("denied"));
            }
            other => panic!("expected partial delete, got {other:?}"),
        }
    }

    #[test]
    fn removal_from_result_classifies() {
        assert!(matches!(Removal::from_result(Ok(())), Removal::Removed));
        assert!(matches!(
            Removal::from_result(Err(StoreError::NotFound("x".into()))),
            Removal::Missing
        ));
        assert!(Removal::from_result(Err(StoreError::Integrity("x".into()))).is_failed());
    }
}
