// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encrypted Object Store
//!
//! Persists uploaded files encrypted at rest with AES-256-GCM. Each object is
//! a pair of sibling files under the storage root:
//!
//! ```text
//! ./uploads/
//!   {id}            # iv || tag || ciphertext
//!   {id}.meta       # JSON descriptor (original name, size, mimetype, date)
//!   .staging/       # in-flight writes, swept on open
//! ```
//!
//! ## Security Model
//!
//! - Blob contents are only readable with the store key
//! - Any modification of a blob causes read failure (GCM tag check)
//! - Original file names never reach the filesystem; ids are SHA-256 digests
//! - Externally supplied ids are validated before any path is built
//! - Descriptors are plaintext: names, sizes and dates are visible to anyone
//!   with filesystem access
//!
//! ## Layers
//!
//! - [`envelope`]: seal/open a single buffer
//! - [`identifier`]: derive and validate ids
//! - [`disk`]: staged, durable file writes
//! - [`ledger`]: descriptor records
//! - [`store`]: the [`FileStore`] facade tying them together

pub mod disk;
pub mod envelope;
pub mod error;
pub mod identifier;
pub mod ledger;
pub mod paths;
pub mod store;

pub use disk::DiskStorage;
pub use envelope::{EncryptionKey, EnvelopeCipher};
pub use error::{DeleteReport, Removal, StoreError, StoreResult};
pub use identifier::{IdPolicy, StorageId};
pub use ledger::{MetadataLedger, ObjectDescriptor};
pub use paths::StoragePaths;
pub use store::{FileStore, StoreConfig};
