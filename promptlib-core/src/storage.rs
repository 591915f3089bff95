//! Storage trait and portable document I/O.
//!
//! [`PromptStore`] is the seam between the application state and whatever
//! persists the collection; [`read_document`] / [`write_document`] handle
//! standalone JSON documents for import and export, with validation errors
//! that are messages rather than panics.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::prompt::Prompt;

/// Persistent storage for the whole prompt collection.
///
/// The collection is saved and loaded as one ordered document; record-level
/// operations (add, update, delete, merge) are the application layer's job.
pub trait PromptStore {
    type Error: std::error::Error + Send + Sync;

    fn load(&self) -> Result<Vec<Prompt>, Self::Error>;
    fn save(&self, prompts: &[Prompt]) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not a valid prompt document: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode prompt document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Reads an external JSON document into prompt records.
///
/// The document must be a JSON array of prompt objects. Unknown category
/// labels are coerced, missing optional fields take their defaults, and
/// every record is normalized; anything structurally wrong surfaces as
/// [`DocumentError::Invalid`] with the decoder's message.
pub fn read_document(path: &Path) -> Result<Vec<Prompt>, DocumentError> {
    let raw = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut prompts: Vec<Prompt> =
        serde_json::from_str(&raw).map_err(|source| DocumentError::Invalid {
            path: path.display().to_string(),
            source,
        })?;
    for prompt in &mut prompts {
        prompt.normalize();
    }
    Ok(prompts)
}

/// Writes the collection to an external JSON document, pretty-printed.
pub fn write_document(path: &Path, prompts: &[Prompt]) -> Result<(), DocumentError> {
    let data = serde_json::to_string_pretty(prompts).map_err(DocumentError::Encode)?;
    fs::write(path, data).map_err(|source| DocumentError::Write {
        path: path.display().to_string(),
        source,
    })
}
