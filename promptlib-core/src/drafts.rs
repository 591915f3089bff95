//! # Draft Cache
//!
//! Unsaved editor state, cached per prompt id in a document next to the
//! library so an in-progress edit survives a restart. A draft exists only
//! while it differs from the saved record; reverting an edit back to the
//! original value removes it again.
//!
//! Writes are debounced: each [`DraftCache::save_draft`] call resets a
//! quiet-period deadline and the host loop drives the actual write through
//! [`DraftCache::poll`]. On shutdown [`DraftCache::flush`] writes any
//! pending state synchronously. Draft persistence is never fatal:
//! failures are reported for the caller to log, and a damaged draft
//! document loads as empty rather than blocking startup.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::prompt::{Category, Prompt, canon_custom_category, canon_tags, canon_text};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode drafts: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to replace {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Candidate editor state for one prompt, not yet committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub prompt_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

impl Draft {
    /// Editor state equal to the saved record.
    pub fn of(prompt: &Prompt) -> Draft {
        Draft {
            prompt_id: prompt.id,
            name: prompt.name.clone(),
            content: prompt.content.clone(),
            category: prompt.category,
            custom_category: prompt.custom_category.clone(),
            tags: prompt.tags.clone(),
            captured_at: Utc::now(),
        }
    }

    /// Field-by-field dirty check against the saved record, in canonical
    /// form so edits that round-trip back to the original value do not
    /// count as changes.
    pub fn differs_from(&self, prompt: &Prompt) -> bool {
        self.name.trim() != prompt.name.trim()
            || canon_text(&self.content) != canon_text(&prompt.content)
            || self.category != prompt.category
            || canon_custom_category(self.custom_category.as_deref(), self.category)
                != canon_custom_category(prompt.custom_category.as_deref(), prompt.category)
            || canon_tags(&self.tags) != canon_tags(&prompt.tags)
    }

    /// Commits the draft into the record and marks it modified.
    pub fn apply_to(&self, prompt: &mut Prompt) {
        prompt.name = self.name.clone();
        prompt.content = self.content.clone();
        prompt.category = self.category;
        prompt.custom_category = self.custom_category.clone();
        prompt.tags = self.tags.clone();
        prompt.normalize();
        prompt.touch();
    }
}

/// Persistent cache of unsaved drafts, keyed by prompt id.
#[derive(Debug)]
pub struct DraftCache {
    path: PathBuf,
    debounce: Duration,
    drafts: BTreeMap<Uuid, Draft>,
    write_due: Option<Instant>,
}

impl DraftCache {
    /// Opens the cache, loading any drafts left by a previous run. A
    /// missing or damaged document yields an empty cache; draft loss is
    /// never a startup failure.
    pub fn open(path: PathBuf) -> DraftCache {
        let drafts = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<Uuid, Draft>>(&raw) {
                Ok(drafts) => drafts,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "draft cache did not parse, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        DraftCache {
            path,
            debounce: DEFAULT_DEBOUNCE,
            drafts,
            write_due: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> DraftCache {
        self.debounce = debounce;
        self
    }

    /// Records editor state for the prompt and schedules a debounced
    /// write. When the draft equals the saved record in canonical form the
    /// cached entry is dropped instead, so a reverted edit leaves nothing
    /// behind.
    pub fn save_draft(&mut self, saved: &Prompt, draft: Draft) {
        if draft.differs_from(saved) {
            self.drafts.insert(saved.id, draft);
        } else if self.drafts.remove(&saved.id).is_none() {
            // Nothing cached and nothing changed: no write needed.
            return;
        }
        self.write_due = Some(Instant::now() + self.debounce);
    }

    pub fn load_draft(&self, id: Uuid) -> Option<&Draft> {
        self.drafts.get(&id)
    }

    /// Removes the draft for an explicit save, discard or delete, and
    /// persists immediately (not debounced).
    pub fn clear_draft(&mut self, id: Uuid) -> Result<(), DraftError> {
        if self.drafts.remove(&id).is_none() && self.write_due.is_none() {
            return Ok(());
        }
        self.write_now()
    }

    /// Writes the pending state once the quiet period has elapsed.
    /// Returns whether a write happened. Call from the host loop's tick.
    pub fn poll(&mut self) -> Result<bool, DraftError> {
        match self.write_due {
            Some(due) if Instant::now() >= due => {
                self.write_now()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Synchronously writes any pending state. Must run before exit or a
    /// trailing debounced edit is lost.
    pub fn flush(&mut self) -> Result<(), DraftError> {
        if self.write_due.is_some() {
            self.write_now()?;
        }
        Ok(())
    }

    pub fn has_pending_write(&self) -> bool {
        self.write_due.is_some()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    fn write_now(&mut self) -> Result<(), DraftError> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let data = serde_json::to_string_pretty(&self.drafts).map_err(DraftError::Encode)?;
        let dir = self.path.parent().map(PathBuf::from).unwrap_or_default();
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(&self.path).map_err(|source| DraftError::Persist {
            path: self.path.clone(),
            source,
        })?;
        self.write_due = None;
        Ok(())
    }
}
