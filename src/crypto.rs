//! Passphrase-to-key derivation using Argon2id.

use crate::config::{KdfParams, KEY_LEN, SALT_LEN};
use crate::error::{Result, VaultError};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::time::Instant;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Generate a new random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a 256-bit key from a passphrase.
///
/// Identical passphrase, salt and params always produce the same key.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN], params: KdfParams) -> Result<VaultKey> {
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let started = Instant::now();
    let mut key = VaultKey {
        bytes: [0u8; KEY_LEN],
        salt: *salt,
        params,
    };
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key.bytes)
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;

    tracing::debug!(
        memory_kib = params.memory_kib,
        iterations = params.iterations,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "derived key"
    );

    Ok(key)
}

/// A derived key together with the salt and params that produced it.
///
/// Key bytes are zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
    salt: [u8; SALT_LEN],
    #[zeroize(skip)]
    params: KdfParams,
}

impl VaultKey {
    /// Get a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Compare key bytes without short-circuiting on the first difference.
    pub fn same_key(&self, other: &VaultKey) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}
