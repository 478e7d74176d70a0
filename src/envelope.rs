//! Versioned AES-256-GCM envelope for the store file.
//!
//! A sealed blob is a fixed 49-byte header followed by the GCM ciphertext
//! and tag. The header carries everything needed to re-derive the key
//! (salt and Argon2 work factors) plus the nonce and a save timestamp, and
//! the whole header is bound as associated data, so editing any of it
//! breaks authentication just like editing the ciphertext does.

use crate::config::{KdfParams, FORMAT_VERSION, HEADER_LEN, MIN_BLOB_LEN, NONCE_LEN, SALT_LEN};
use crate::crypto::VaultKey;
use crate::error::{Result, VaultError};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use chrono::{DateTime, Local, TimeZone, Utc};

/// Parsed envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    /// Unix seconds at which the blob was sealed.
    pub saved_at: u64,
    /// Work factors as read from disk, not yet bounds-checked.
    pub raw_params: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
}

impl Header {
    /// Parse the header of a non-empty blob.
    pub fn parse(blob: &[u8]) -> Result<Self> {
        check_len(blob)?;

        let version = blob[0];
        if version != FORMAT_VERSION {
            return Err(VaultError::Format(format!(
                "unsupported format version {version}"
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&blob[21..21 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&blob[37..37 + NONCE_LEN]);

        Ok(Self {
            version,
            saved_at: u64::from_le_bytes(field(blob, 1)),
            raw_params: KdfParams {
                memory_kib: u32::from_le_bytes(field(blob, 9)),
                iterations: u32::from_le_bytes(field(blob, 13)),
                parallelism: u32::from_le_bytes(field(blob, 17)),
            },
            salt,
            nonce,
        })
    }

    /// Work factors, rejected if a corrupted header asks for absurd work.
    pub fn kdf_params(&self) -> Result<KdfParams> {
        self.raw_params
            .validate()
            .map_err(|e| VaultError::Format(e.to_string()))?;
        Ok(self.raw_params)
    }

    /// Local time the blob was sealed.
    pub fn saved_at_local(&self) -> Option<DateTime<Local>> {
        let secs = i64::try_from(self.saved_at).ok()?;
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(|t| t.with_timezone(&Local))
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.version;
        out[1..9].copy_from_slice(&self.saved_at.to_le_bytes());
        out[9..13].copy_from_slice(&self.raw_params.memory_kib.to_le_bytes());
        out[13..17].copy_from_slice(&self.raw_params.iterations.to_le_bytes());
        out[17..21].copy_from_slice(&self.raw_params.parallelism.to_le_bytes());
        out[21..37].copy_from_slice(&self.salt);
        out[37..49].copy_from_slice(&self.nonce);
        out
    }
}

fn check_len(blob: &[u8]) -> Result<()> {
    if blob.len() < MIN_BLOB_LEN {
        return Err(VaultError::Format(format!(
            "expected at least {} bytes, found {}",
            MIN_BLOB_LEN,
            blob.len()
        )));
    }
    Ok(())
}

fn field<const N: usize>(blob: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&blob[offset..offset + N]);
    buf
}

/// Seal plaintext under `key`.
///
/// A fresh nonce is drawn on every call, so sealing the same plaintext
/// twice never yields the same blob.
pub fn encrypt(key: &VaultKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);

    let header = Header {
        version: FORMAT_VERSION,
        saved_at: u64::try_from(Utc::now().timestamp()).unwrap_or(0),
        raw_params: key.params(),
        salt: *key.salt(),
        nonce: nonce_bytes,
    };
    let header_bytes = header.to_bytes();

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad: &header_bytes,
            },
        )
        .map_err(|_| VaultError::Encryption)?;

    let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    blob.extend_from_slice(&header_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Open a sealed blob.
///
/// An empty blob stands for a store that has never been saved and opens
/// to empty plaintext. Header fields are only trusted once the tag
/// verifies, so a changed version byte fails authentication like any
/// other edit.
pub fn decrypt(key: &VaultKey, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    check_len(blob)?;
    let (header_bytes, ciphertext) = blob.split_at(HEADER_LEN);
    let nonce = &header_bytes[HEADER_LEN - NONCE_LEN..];

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: header_bytes,
            },
        )
        .map_err(|_| VaultError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;

    fn test_key(passphrase: &str) -> VaultKey {
        derive_key(passphrase, &[3u8; SALT_LEN], KdfParams::minimal()).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = test_key("test_passphrase");
        let plaintext = b"alpha\nbeta\ngamma";

        let blob = encrypt(&key, plaintext).unwrap();
        assert_eq!(blob.len(), HEADER_LEN + plaintext.len() + 16);

        let decrypted = decrypt(&key, &blob).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let key = test_key("test_passphrase");
        let blob = encrypt(&key, b"").unwrap();
        assert_eq!(blob.len(), MIN_BLOB_LEN);
        assert!(decrypt(&key, &blob).unwrap().is_empty());
    }

    #[test]
    fn test_empty_blob_is_empty_plaintext() {
        let key = test_key("anything");
        assert!(decrypt(&key, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_content_with_high_bytes_round_trips() {
        // 0xFF was the old end-of-content marker; it must survive.
        let key = test_key("test_passphrase");
        let plaintext = [0xFFu8, 0x00, 0xFF, b'a', 0xFF];
        let blob = encrypt(&key, &plaintext).unwrap();
        assert_eq!(decrypt(&key, &blob).unwrap(), plaintext);
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let key = test_key("test_passphrase");
        let blob1 = encrypt(&key, b"same data").unwrap();
        let blob2 = encrypt(&key, b"same data").unwrap();
        assert_ne!(blob1, blob2);
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let blob = encrypt(&test_key("correct"), b"secret").unwrap();
        let result = decrypt(&test_key("wrong"), &blob);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_any_flipped_byte_fails_authentication() {
        let key = test_key("test_passphrase");
        let blob = encrypt(&key, b"user: alice pw: hunter2").unwrap();

        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let result = decrypt(&key, &tampered);
            assert!(
                matches!(result, Err(VaultError::Authentication)),
                "flipping byte {i} was not detected"
            );
        }
    }

    #[test]
    fn test_unknown_version() {
        let key = test_key("test_passphrase");
        let mut blob = encrypt(&key, b"data").unwrap();
        blob[0] = 9;
        assert!(matches!(Header::parse(&blob), Err(VaultError::Format(_))));
        assert!(matches!(decrypt(&key, &blob), Err(VaultError::Authentication)));
    }

    #[test]
    fn test_truncated_blob_is_format_error() {
        let key = test_key("test_passphrase");
        let blob = encrypt(&key, b"data").unwrap();
        for len in [1, HEADER_LEN, MIN_BLOB_LEN - 1] {
            let result = decrypt(&key, &blob[..len]);
            assert!(matches!(result, Err(VaultError::Format(_))), "len {len}");
        }
    }

    #[test]
    fn test_header_exposes_key_material() {
        let key = test_key("test_passphrase");
        let blob = encrypt(&key, b"data").unwrap();
        let header = Header::parse(&blob).unwrap();

        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(&header.salt, key.salt());
        assert_eq!(header.kdf_params().unwrap(), KdfParams::minimal());
        assert!(header.saved_at > 0);
        assert!(header.saved_at_local().is_some());
    }

    #[test]
    fn test_absurd_header_params_rejected() {
        let key = test_key("test_passphrase");
        let mut blob = encrypt(&key, b"data").unwrap();
        blob[9..13].copy_from_slice(&u32::MAX.to_le_bytes());
        let header = Header::parse(&blob).unwrap();
        assert!(matches!(header.kdf_params(), Err(VaultError::Format(_))));
    }
}
