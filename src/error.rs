//! Error types for linevault.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Authentication failed - wrong passphrase or tampered file")]
    Authentication,

    #[error("Malformed store file: {0}")]
    Format(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No record at index {index} (store has {len} records)")]
    Range { index: i64, len: usize },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Passphrases do not match")]
    PassphraseMismatch,

    #[error("Current passphrase is incorrect")]
    WrongPassphrase,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encryption,

    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl VaultError {
    /// Whether the error means the decrypted state cannot be trusted.
    ///
    /// Fatal errors end the session; everything else is reported and the
    /// shell keeps running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VaultError::Authentication | VaultError::Format(_))
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
