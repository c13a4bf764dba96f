// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage identifiers.
//!
//! An object's id is the SHA-256 digest of its original name followed by the
//! upload instant in Unix milliseconds, rendered as 64 lowercase hex
//! characters. The original name therefore never reaches the filesystem and
//! is not recoverable from the id.
//!
//! Two saves of the same name within the same millisecond produce the same
//! id and the second overwrites the first. [`IdPolicy::Salted`] mixes random
//! bytes into the digest to avoid that, at the cost of ids no longer being
//! reproducible from name and time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{StoreError, StoreResult};

/// Length of a rendered id (hex of a 256-bit digest).
pub const ID_HEX_LEN: usize = 64;

/// Random bytes mixed in by [`IdPolicy::Salted`].
pub const ID_SALT_LEN: usize = 16;

/// Validated storage identifier: exactly 64 lowercase hex characters.
///
/// Anything that can become a path component outside the storage root
/// (separators, `..`, NUL) is rejected by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageId(String);

impl StorageId {
    /// Parse an externally supplied id.
    ///
    /// Malformed ids cannot name a stored object, so they are reported as
    /// `NotFound` rather than as a separate validation error.
    pub fn parse(value: &str) -> StoreResult<Self> {
        let well_formed = value.len() == ID_HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if well_formed {
            Ok(Self(value.to_string()))
        } else {
            Err(StoreError::NotFound("malformed storage id".to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_digest(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorageId> for String {
    fn from(value: StorageId) -> Self {
        value.0
    }
}

impl FromStr for StorageId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Derive the id for `original_name` uploaded at `at`.
///
/// Deterministic: the same name and millisecond always give the same id.
pub fn generate(original_name: &str, at: DateTime<Utc>) -> StorageId {
    let mut hasher = Sha256::new();
    hasher.update(original_name.as_bytes());
    hasher.update(at.timestamp_millis().to_string().as_bytes());
    StorageId::from_digest(hasher)
}

/// Like [`generate`] but with `salt` appended to the digest input.
pub fn generate_salted(original_name: &str, at: DateTime<Utc>, salt: &[u8]) -> StorageId {
    let mut hasher = Sha256::new();
    hasher.update(original_name.as_bytes());
    hasher.update(at.timestamp_millis().to_string().as_bytes());
    hasher.update(salt);
    StorageId::from_digest(hasher)
}

/// How the store derives ids for new objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// SHA-256 over name and time only.
    #[default]
    NameAndTime,
    /// SHA-256 over name, time and fresh random bytes.
    Salted,
}

impl IdPolicy {
    pub fn generate(&self, original_name: &str, at: DateTime<Utc>) -> StorageId {
        match self {
            IdPolicy::NameAndTime => generate(original_name, at),
            IdPolicy::Salted => {
                let mut salt = [0u8; ID_SALT_LEN];
                OsRng.fill_bytes(&mut salt);
                generate_salted(original_name, at, &salt)
            }
        }
    }
}

impl FromStr for IdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name-time" | "name_time" => Ok(IdPolicy::NameAndTime),
            "salted" => Ok(IdPolicy::Salted),
            other => Err(format!(
                "unknown id policy '{other}' (expected 'name-time' or 'salted')"
            )),
        }
    }
}
