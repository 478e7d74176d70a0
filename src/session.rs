//! The open store: file path, active key and decrypted records.

use crate::config::{KdfParams, SALT_LEN};
use crate::crypto::{self, VaultKey};
use crate::envelope::{self, Header};
use crate::error::{Result, VaultError};
use crate::store::RecordStore;
use crate::terminal::Terminal;
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// A single open store, owned by the shell for its whole lifetime.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    key: VaultKey,
    store: RecordStore,
    /// Work factors for keys created during this session.
    params: KdfParams,
    dirty: bool,
}

impl Session {
    /// Open the store at `path`, prompting for the passphrase.
    ///
    /// A missing or empty file starts a new, empty store under a freshly
    /// chosen passphrase; nothing is written until the first save.
    pub fn open<T: Terminal + ?Sized>(path: &Path, params: KdfParams, term: &mut T) -> Result<Self> {
        params.validate()?;

        let blob = if path.exists() {
            for warn in utils::check_file_permissions(path) {
                utils::warning(term.out(), &warn)?;
            }
            fs::read(path)?
        } else {
            writeln!(
                term.out(),
                "no file {}. initializing new one",
                path.display()
            )?;
            Vec::new()
        };

        if blob.is_empty() {
            let passphrase = prompt_new_passphrase(term)?;
            let key = derive(&passphrase, &crypto::generate_salt(), params)?;
            tracing::info!(path = %path.display(), "initialized new store");
            return Ok(Self {
                path: path.to_path_buf(),
                key,
                store: RecordStore::new(),
                params,
                dirty: false,
            });
        }

        let header = Header::parse(&blob)?;
        let file_params = header.kdf_params()?;
        let passphrase = term.read_secret("Passphrase")?;
        let key = derive(&passphrase, &header.salt, file_params)?;
        drop(passphrase);

        let plaintext = Zeroizing::new(envelope::decrypt(&key, &blob)?);
        let store = RecordStore::load(&plaintext)?;

        let saved = header
            .saved_at_local()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        writeln!(
            term.out(),
            "opened {} ({} records, last saved {})",
            path.display(),
            store.len(),
            saved
        )?;
        tracing::info!(path = %path.display(), records = store.len(), "opened store");

        Ok(Self {
            path: path.to_path_buf(),
            key,
            store,
            params,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Whether there are mutations since the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn insert(&mut self, text: &str) -> Result<usize> {
        let index = self.store.insert(text)?;
        self.dirty = true;
        Ok(index)
    }

    pub fn delete(&mut self, index: usize) -> Result<Zeroizing<String>> {
        let removed = self.store.delete(index)?;
        self.dirty = true;
        Ok(removed)
    }

    pub fn delete_all(&mut self) {
        self.store.delete_all();
        self.dirty = true;
    }

    /// Seal the entire content under the active key and write it out.
    ///
    /// On failure neither the records nor the file on disk change.
    pub fn save(&mut self) -> Result<()> {
        self.write_with(&self.key)?;
        self.dirty = false;
        tracing::info!(path = %self.path.display(), records = self.store.len(), "saved store");
        Ok(())
    }

    /// Re-key the store and save it under the new key.
    ///
    /// The current passphrase must be re-entered first. The new key gets a
    /// fresh salt, and the session only switches to it once the file has
    /// been written, so the file and the active key never disagree.
    pub fn change_key<T: Terminal + ?Sized>(&mut self, term: &mut T) -> Result<()> {
        let current = term.read_secret("Current passphrase")?;
        let check = derive(&current, self.key.salt(), self.key.params())?;
        drop(current);
        if !check.same_key(&self.key) {
            return Err(VaultError::WrongPassphrase);
        }

        let passphrase = prompt_new_passphrase(term)?;
        let new_key = derive(&passphrase, &crypto::generate_salt(), self.params)?;
        drop(passphrase);

        self.write_with(&new_key)?;
        self.key = new_key;
        self.dirty = false;
        tracing::info!(path = %self.path.display(), "changed passphrase");
        Ok(())
    }

    fn write_with(&self, key: &VaultKey) -> Result<()> {
        let plaintext = Zeroizing::new(self.store.serialize());
        let blob = envelope::encrypt(key, &plaintext)?;
        utils::write_atomic(&self.path, &blob)
    }
}

/// Ask for a new passphrase twice.
fn prompt_new_passphrase<T: Terminal + ?Sized>(term: &mut T) -> Result<Zeroizing<String>> {
    let first = term.read_secret("New passphrase")?;
    if first.is_empty() {
        return Err(VaultError::Validation(
            "passphrase must not be empty".to_string(),
        ));
    }
    let second = term.read_secret("Confirm passphrase")?;
    if *first != *second {
        return Err(VaultError::PassphraseMismatch);
    }
    Ok(first)
}

fn derive(passphrase: &str, salt: &[u8; SALT_LEN], params: KdfParams) -> Result<VaultKey> {
    utils::with_spinner("Deriving key...", || {
        crypto::derive_key(passphrase, salt, params)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::ScriptedTerminal;
    use tempfile::TempDir;

    fn new_store(dir: &TempDir, passphrase: &str) -> Session {
        let path = dir.path().join("store.lv");
        let mut term = ScriptedTerminal::new(Vec::<String>::new(), [passphrase, passphrase]);
        Session::open(&path, KdfParams::minimal(), &mut term).unwrap()
    }

    fn reopen(path: &Path, passphrase: &str) -> Result<Session> {
        let mut term = ScriptedTerminal::new(Vec::<String>::new(), [passphrase]);
        Session::open(path, KdfParams::minimal(), &mut term)
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.lv");
        let mut term = ScriptedTerminal::new(Vec::<String>::new(), ["pw", "pw"]);

        let session = Session::open(&path, KdfParams::minimal(), &mut term).unwrap();
        assert!(session.store().is_empty());
        assert!(!path.exists());
        assert!(term.output().contains("initializing new one"));
    }

    #[test]
    fn test_new_store_passphrase_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.lv");
        let mut term = ScriptedTerminal::new(Vec::<String>::new(), ["pw", "other"]);

        let result = Session::open(&path, KdfParams::minimal(), &mut term);
        assert!(matches!(result, Err(VaultError::PassphraseMismatch)));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "pw");
        session.insert("alpha").unwrap();
        session.insert("beta").unwrap();
        assert!(session.is_dirty());

        session.save().unwrap();
        assert!(!session.is_dirty());

        let reopened = reopen(session.path(), "pw").unwrap();
        let records: Vec<&str> = reopened.store().iter().map(|(_, r)| r).collect();
        assert_eq!(records, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_save_empty_store_is_loadable() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "pw");
        session.save().unwrap();

        let reopened = reopen(session.path(), "pw").unwrap();
        assert!(reopened.store().is_empty());
    }

    #[test]
    fn test_wrong_passphrase_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "pw");
        session.insert("alpha").unwrap();
        session.save().unwrap();

        let err = reopen(session.path(), "nope").unwrap_err();
        assert!(matches!(err, VaultError::Authentication));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_garbage_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.lv");
        fs::write(&path, b"not a store").unwrap();

        let err = reopen(&path, "pw").unwrap_err();
        assert!(matches!(err, VaultError::Format(_)));
    }

    #[test]
    fn test_change_key() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "old");
        session.insert("alpha").unwrap();
        let old_salt = *session.key.salt();

        let mut term = ScriptedTerminal::new(Vec::<String>::new(), ["old", "new", "new"]);
        session.change_key(&mut term).unwrap();
        assert_ne!(session.key.salt(), &old_salt);
        assert!(!session.is_dirty());

        // Saved immediately under the new key
        assert!(reopen(session.path(), "old").is_err());
        let reopened = reopen(session.path(), "new").unwrap();
        assert_eq!(reopened.store().len(), 1);
    }

    #[test]
    fn test_change_key_requires_current_passphrase() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "old");
        session.save().unwrap();

        let mut term = ScriptedTerminal::new(Vec::<String>::new(), ["guess", "new", "new"]);
        let err = session.change_key(&mut term).unwrap_err();
        assert!(matches!(err, VaultError::WrongPassphrase));
        assert!(!err.is_fatal());

        assert!(reopen(session.path(), "old").is_ok());
    }

    #[test]
    fn test_failed_save_keeps_state() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "pw");
        session.insert("alpha").unwrap();
        session.path = dir.path().join("missing").join("store.lv");

        assert!(matches!(session.save(), Err(VaultError::Io(_))));
        assert!(session.is_dirty());
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_failed_change_keeps_old_key() {
        let dir = TempDir::new().unwrap();
        let mut session = new_store(&dir, "old");
        let old_salt = *session.key.salt();
        session.path = dir.path().join("missing").join("store.lv");

        let mut term = ScriptedTerminal::new(Vec::<String>::new(), ["old", "new", "new"]);
        assert!(session.change_key(&mut term).is_err());
        assert_eq!(session.key.salt(), &old_salt);
    }
}
