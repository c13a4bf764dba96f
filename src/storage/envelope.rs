// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM envelope used for every blob on disk.
//!
//! Wire format: `iv (16 bytes) || tag (16 bytes) || ciphertext`. The
//! ciphertext is the same length as the plaintext and no associated data is
//! authenticated. Each blob carries its own IV and tag, so any copy of it can
//! be opened with the key alone.
//!
//! The IV is 128 bits drawn from the OS RNG on every seal. GCM with a
//! non-96-bit nonce derives its counter block through GHASH, which is
//! supported by `aes-gcm` via the nonce-size type parameter.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use super::{StoreError, StoreResult};

/// AES-256 in GCM mode with a 16-byte nonce and a 16-byte tag.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// IV length in bytes.
pub const IV_LEN: usize = 16;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Fixed prefix before the ciphertext.
pub const HEADER_LEN: usize = IV_LEN + TAG_LEN;

/// 256-bit store key. Wiped from memory on drop.
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Parse a hex-encoded key (64 hex characters).
    pub fn from_hex(encoded: &str) -> StoreResult<Self> {
        let bytes = Zeroizing::new(hex::decode(encoded.trim()).map_err(|e| {
            StoreError::Configuration(format!("encryption key is not valid hex: {e}"))
        })?);
        Self::from_bytes(&bytes)
    }

    /// Build a key from raw bytes; anything other than 32 bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(StoreError::Configuration(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        Self(key)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Borrowed view of an envelope split into its three parts.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub iv: &'a [u8],
    pub tag: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split raw bytes into iv, tag and ciphertext.
    pub fn parse(bytes: &'a [u8]) -> StoreResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(StoreError::Integrity(format!(
                "envelope too short: {} bytes, need at least {HEADER_LEN}",
                bytes.len()
            )));
        }
        let (iv, rest) = bytes.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        Ok(Self {
            iv,
            tag,
            ciphertext,
        })
    }
}

/// Keyed cipher. The key schedule is computed once and reused for every
/// seal/open.
#[derive(Clone)]
pub struct EnvelopeCipher {
    cipher: Aes256Gcm16,
}

impl EnvelopeCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm16::new(GenericArray::from_slice(&key.0[..])),
        }
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn seal(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut sealed = Vec::with_capacity(HEADER_LEN + plaintext.len());
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(&[0u8; TAG_LEN]);
        sealed.extend_from_slice(plaintext);

        let tag = self
            .cipher
            .encrypt_in_place_detached(
                GenericArray::from_slice(&iv),
                b"",
                &mut sealed[HEADER_LEN..],
            )
            .map_err(|_| {
                StoreError::Encryption("plaintext exceeds the AES-GCM message limit".to_string())
            })?;
        sealed[IV_LEN..HEADER_LEN].copy_from_slice(&tag);
        Ok(sealed)
    }

    /// Verify and decrypt an envelope.
    ///
    /// The tag is checked over the whole ciphertext before any keystream is
    /// applied; on failure nothing but the error is returned.
    pub fn open(&self, bytes: &[u8]) -> StoreResult<Vec<u8>> {
        let envelope = Envelope::parse(bytes)?;
        let mut buffer = envelope.ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(envelope.iv),
                b"",
                &mut buffer,
                GenericArray::from_slice(envelope.tag),
            )
            .map_err(|_| StoreError::Integrity("authentication tag mismatch".to_string()))?;
        Ok(buffer)
    }
}

impl fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvelopeCipher(AES-256-GCM)")
    }
}

/// Seal `plaintext` under `key`.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
    EnvelopeCipher::new(key).seal(plaintext)
}

/// Open an envelope produced by [`encrypt`].
pub fn decrypt(key: &EncryptionKey, envelope: &[u8]) -> StoreResult<Vec<u8>> {
    EnvelopeCipher::new(key).open(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn key() -> EncryptionKey {
        EncryptionKey::from_hex(HEX_KEY).unwrap()
    }

    #[test]
    fn roundtrip_various_lengths() {
        let key = key();
        for len in [0usize, 1, 15, 16, 17, 4096] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let sealed = encrypt(&key, &plaintext).unwrap();
            assert_eq!(sealed.len(), HEADER_LEN + plaintext.len());
            assert_eq!(decrypt(&key, &sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn empty_plaintext_is_header_only() {
        let sealed = encrypt(&key(), b"").unwrap();
        assert_eq!(sealed.len(), HEADER_LEN);
        assert!(decrypt(&key(), &sealed).unwrap().is_empty());
    }

    #[test]
    fn every_single_bit_flip_is_rejected() {
        let key = key();
        let sealed = encrypt(&key, b"hello world").unwrap();

        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&key, &tampered);
                assert!(
                    matches!(result, Err(StoreError::Integrity(_))),
                    "flip at byte {byte} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn same_plaintext_gives_different_envelopes() {
        let key = key();
        let first = encrypt(&key, b"same bytes").unwrap();
        let second = encrypt(&key, b"same bytes").unwrap();

        assert_ne!(first, second);
        assert_ne!(first[..IV_LEN], second[..IV_LEN]);
    }

    #[test]
    fn wrong_key_fails_integrity() {
        let sealed = encrypt(&key(), b"secret").unwrap();
        let other = EncryptionKey::generate();
        assert!(matches!(
            decrypt(&other, &sealed),
            Err(StoreError::Integrity(_))
        ));
    }

    #[test]
    fn short_envelope_fails_integrity() {
        for len in [0usize, 1, 16, HEADER_LEN - 1] {
            let result = decrypt(&key(), &vec![0u8; len]);
            assert!(matches!(result, Err(StoreError::Integrity(_))), "len {len}");
        }
    }

    #[test]
    fn truncated_ciphertext_fails_integrity() {
        let sealed = encrypt(&key(), b"hello world").unwrap();
        let result = decrypt(&key(), &sealed[..sealed.len() - 1]);
        assert!(matches!(result, Err(StoreError::Integrity(_))));
    }

    #[test]
    fn envelope_parse_splits_layout() {
        let sealed = encrypt(&key(), b"abc").unwrap();
        let envelope = Envelope::parse(&sealed).unwrap();
        assert_eq!(envelope.iv.len(), IV_LEN);
        assert_eq!(envelope.tag.len(), TAG_LEN);
        assert_eq!(envelope.ciphertext.len(), 3);
        assert_ne!(envelope.ciphertext, b"abc");
    }

    #[test]
    fn key_must_be_exactly_32_bytes() {
        assert!(EncryptionKey::from_hex(HEX_KEY).is_ok());
        assert!(EncryptionKey::from_hex(&format!("  {HEX_KEY}\n")).is_ok());

        let bad_keys = vec![
            String::new(),
            "00".to_string(),
            HEX_KEY[..62].to_string(),
            format!("{HEX_KEY}00"),
            HEX_KEY.replace('0', "z"),
            HEX_KEY[..63].to_string(),
        ];
        for bad in &bad_keys {
            assert!(
                matches!(
                    EncryptionKey::from_hex(bad),
                    Err(StoreError::Configuration(_))
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn debug_output_redacts_key() {
        let rendered = format!("{:?}", key());
        assert!(!rendered.contains("0102"));
        assert!(rendered.contains("redacted"));
    }
}
