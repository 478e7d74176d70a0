//! linevault: a passphrase-protected store of text records.
//!
//! The store file is a single AES-256-GCM envelope keyed by Argon2id. On
//! open it is decrypted into a [`RecordStore`] of line records that the
//! interactive [`Shell`] reads and mutates; saving re-seals the whole
//! content.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod interactive;
pub mod session;
pub mod store;
pub mod terminal;
pub mod utils;

// Re-export commonly used types
pub use config::KdfParams;
pub use error::{Result, VaultError};
pub use interactive::{Shell, State};
pub use session::Session;
pub use store::RecordStore;
pub use terminal::{ScriptedTerminal, Terminal};
