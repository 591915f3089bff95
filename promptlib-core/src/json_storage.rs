//! # JSON Storage
//!
//! This module persists the prompt collection as a single JSON document in
//! a data directory, alongside the draft document and rotating backups.
//!
//! Saves are atomic: the document is written to a temporary file in the
//! same directory and then renamed over `prompts.json`. Before each save
//! the previous document is rotated into numbered backups
//! (`prompts.json.bak.1` is the newest) with the oldest dropped past the
//! retention count. Loads fall back to the newest backup that still parses
//! when the primary document is corrupted.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::prompt::Prompt;
use crate::storage::PromptStore;

pub const LIBRARY_FILE: &str = "prompts.json";
pub const DRAFTS_FILE: &str = "drafts.json";
pub const DEFAULT_BACKUP_RETENTION: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid data directory: {}", .0.display())]
    InvalidDataDir(PathBuf),
    #[error("failed to encode prompt library: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to replace {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
    #[error(
        "{} is corrupted and no backup could be recovered: {source}",
        .path.display()
    )]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON-document store for the prompt collection.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    /// Directory holding `prompts.json`, `drafts.json` and the backups.
    pub data_dir: PathBuf,
    /// How many numbered backups to keep. Zero disables backups.
    pub backup_retention: usize,
}

impl JsonStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> JsonStorage {
        JsonStorage {
            data_dir: data_dir.into(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
        }
    }

    pub fn with_retention(mut self, backup_retention: usize) -> JsonStorage {
        self.backup_retention = backup_retention;
        self
    }

    pub fn library_path(&self) -> PathBuf {
        self.data_dir.join(LIBRARY_FILE)
    }

    pub fn drafts_path(&self) -> PathBuf {
        self.data_dir.join(DRAFTS_FILE)
    }

    fn backup_path(&self, slot: usize) -> PathBuf {
        self.data_dir.join(format!("{LIBRARY_FILE}.bak.{slot}"))
    }

    pub fn ensure_data_dir(&self) -> Result<(), StorageError> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)?;
        } else if !self.data_dir.is_dir() {
            return Err(StorageError::InvalidDataDir(self.data_dir.clone()));
        }
        Ok(())
    }

    /// Shifts `bak.1 -> bak.2 -> ...`, drops the slot past retention, and
    /// copies the current document into `bak.1`.
    fn rotate_backups(&self) -> io::Result<()> {
        let oldest = self.backup_path(self.backup_retention);
        if oldest.exists() {
            fs::remove_file(oldest)?;
        }
        for slot in (1..self.backup_retention).rev() {
            let from = self.backup_path(slot);
            if from.exists() {
                fs::rename(from, self.backup_path(slot + 1))?;
            }
        }
        fs::copy(self.library_path(), self.backup_path(1))?;
        Ok(())
    }

    /// Tries each backup, newest first, returning the first collection
    /// that still parses.
    fn recover_from_backups(&self) -> Option<Vec<Prompt>> {
        for slot in 1..=self.backup_retention {
            let path = self.backup_path(slot);
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            match serde_json::from_str::<Vec<Prompt>>(&raw) {
                Ok(mut prompts) => {
                    info!(backup = %path.display(), "recovered prompt library from backup");
                    for prompt in &mut prompts {
                        prompt.normalize();
                    }
                    return Some(prompts);
                }
                Err(err) => {
                    warn!(backup = %path.display(), error = %err, "backup did not parse");
                }
            }
        }
        None
    }
}

impl PromptStore for JsonStorage {
    type Error = StorageError;

    /// Loads the prompt collection.
    ///
    /// A missing document is an empty library. A corrupted document falls
    /// back to the newest valid backup; when no backup parses either, the
    /// error is surfaced so the caller can decide how to proceed. The
    /// store never silently starts over.
    fn load(&self) -> Result<Vec<Prompt>, StorageError> {
        let path = self.library_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str::<Vec<Prompt>>(&raw) {
            Ok(mut prompts) => {
                for prompt in &mut prompts {
                    prompt.normalize();
                }
                Ok(prompts)
            }
            Err(source) => {
                warn!(
                    path = %path.display(),
                    error = %source,
                    "prompt library did not parse, trying backups"
                );
                match self.recover_from_backups() {
                    Some(prompts) => Ok(prompts),
                    None => Err(StorageError::Corrupted { path, source }),
                }
            }
        }
    }

    /// Saves the whole collection atomically.
    ///
    /// The document is written next to its final location and renamed into
    /// place, so a crash mid-save leaves the previous document intact.
    fn save(&self, prompts: &[Prompt]) -> Result<(), StorageError> {
        self.ensure_data_dir()?;

        let path = self.library_path();
        if self.backup_retention > 0 && path.exists() {
            self.rotate_backups()?;
        }

        let data = serde_json::to_string_pretty(prompts).map_err(StorageError::Encode)?;
        let mut tmp = NamedTempFile::new_in(&self.data_dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|source| StorageError::Persist { path, source })?;
        Ok(())
    }
}
