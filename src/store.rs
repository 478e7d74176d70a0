//! In-memory record store over the decrypted content.
//!
//! Records are dense: indices are always `0..len`, and every insert or
//! delete renumbers what follows.

use crate::error::{Result, VaultError};
use regex::RegexBuilder;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

const SEPARATOR: u8 = b'\n';

/// Ordered sequence of line records.
#[derive(Default)]
pub struct RecordStore {
    records: Vec<String>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the record sequence from decrypted content.
    ///
    /// Empty lines are dropped. A line that is not valid UTF-8 means the
    /// content was not written by this tool.
    pub fn load(blob: &[u8]) -> Result<Self> {
        let mut records = Vec::new();
        for (line_no, line) in blob.split(|b| *b == SEPARATOR).enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let text = std::str::from_utf8(line).map_err(|_| {
                VaultError::Format(format!("line {} is not valid UTF-8", line_no + 1))
            })?;
            records.push(text.to_string());
        }
        Ok(Self { records })
    }

    /// Join records with a single newline; no trailing separator.
    pub fn serialize(&self) -> Vec<u8> {
        self.records.join("\n").into_bytes()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.records.iter().map(String::as_str).enumerate()
    }

    /// Append a record and return its index.
    pub fn insert(&mut self, text: &str) -> Result<usize> {
        let text = validate_record(text)?;
        self.records.push(text.to_string());
        Ok(self.records.len() - 1)
    }

    /// Remove the record at `index`, returning its text.
    pub fn delete(&mut self, index: usize) -> Result<Zeroizing<String>> {
        if index >= self.records.len() {
            return Err(VaultError::Range {
                index: index as i64,
                len: self.records.len(),
            });
        }
        Ok(Zeroizing::new(self.records.remove(index)))
    }

    /// Drop every record. Callers are expected to have confirmed first.
    pub fn delete_all(&mut self) {
        for record in &mut self.records {
            record.zeroize();
        }
        self.records.clear();
    }

    /// Records with `start <= index < end`, bounds clamped to the store.
    pub fn read_range(&self, start: usize, end: usize) -> Vec<(usize, &str)> {
        let end = end.min(self.records.len());
        if start >= end {
            return Vec::new();
        }
        self.records[start..end]
            .iter()
            .enumerate()
            .map(|(offset, record)| (start + offset, record.as_str()))
            .collect()
    }

    /// Case-insensitive regex search, in index order.
    pub fn find(&self, pattern: &str) -> Result<Vec<(usize, &str)>> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(self.iter().filter(|(_, record)| regex.is_match(record)).collect())
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("len", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        self.delete_all();
    }
}

/// Records are printable ASCII; surrounding whitespace is trimmed.
fn validate_record(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VaultError::Validation("record text is empty".to_string()));
    }
    if let Some((position, ch)) = text
        .chars()
        .enumerate()
        .find(|(_, ch)| !(ch.is_ascii_graphic() || *ch == ' '))
    {
        return Err(VaultError::Validation(format!(
            "unsupported character {:?} at position {} - please use only printable ASCII",
            ch,
            position + 1
        )));
    }
    Ok(text)
}
