//! On-disk format constants and key derivation work factors.

use crate::error::{Result, VaultError};

/// Current envelope format version.
pub const FORMAT_VERSION: u8 = 1;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// Argon2 salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// version + saved_at + three u32 work factors + salt + nonce.
pub const HEADER_LEN: usize = 1 + 8 + 4 + 4 + 4 + SALT_LEN + NONCE_LEN;

/// Smallest well-formed non-empty blob: a header and a bare tag.
pub const MIN_BLOB_LEN: usize = HEADER_LEN + TAG_LEN;

const MEMORY_BOUNDS: (u32, u32) = (8, 1024 * 1024);
const ITERATION_BOUNDS: (u32, u32) = (1, 64);
const PARALLELISM_BOUNDS: (u32, u32) = (1, 16);

/// Argon2id work factors.
///
/// Stored in every envelope header so a file always opens with the
/// parameters it was sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Create params, rejecting values outside the accepted bounds.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            memory_kib,
            iterations,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    /// The cheapest accepted parameters. Only suitable for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: MEMORY_BOUNDS.0,
            iterations: ITERATION_BOUNDS.0,
            parallelism: PARALLELISM_BOUNDS.0,
        }
    }

    /// Check every factor against its bounds.
    pub fn validate(&self) -> Result<()> {
        check("memory", self.memory_kib, MEMORY_BOUNDS)?;
        check("iterations", self.iterations, ITERATION_BOUNDS)?;
        check("parallelism", self.parallelism, PARALLELISM_BOUNDS)?;
        // Argon2 requires at least 8 KiB per lane.
        if self.memory_kib < 8 * self.parallelism {
            return Err(VaultError::Validation(format!(
                "kdf memory must be at least {} KiB for parallelism {}",
                8 * self.parallelism,
                self.parallelism
            )));
        }
        Ok(())
    }
}

fn check(name: &str, value: u32, (min, max): (u32, u32)) -> Result<()> {
    if value < min || value > max {
        return Err(VaultError::Validation(format!(
            "kdf {name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        assert_eq!(HEADER_LEN, 49);
        assert_eq!(MIN_BLOB_LEN, 65);
    }

    #[test]
    fn test_default_and_minimal_are_valid() {
        assert!(KdfParams::default().validate().is_ok());
        assert!(KdfParams::minimal().validate().is_ok());
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        assert!(KdfParams::new(4, 1, 1).is_err());
        assert!(KdfParams::new(65536, 0, 1).is_err());
        assert!(KdfParams::new(65536, 3, 17).is_err());
        assert!(KdfParams::new(u32::MAX, 3, 1).is_err());
        // Not enough memory for the requested lanes.
        assert!(KdfParams::new(16, 1, 4).is_err());
        assert!(KdfParams::new(32, 1, 4).is_ok());
    }
}
