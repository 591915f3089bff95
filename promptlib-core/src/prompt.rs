//! Core prompt record and category types.
//!
//! A [`Prompt`] is the atomic unit the library manages: a named piece of
//! text with a category, tags and version-lineage metadata. Records are
//! plain serde structs; every field the on-disk document may omit carries a
//! typed default so legacy documents load without errors.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prompt categories.
///
/// The set is closed; anything else found in a document is coerced to
/// [`Category::Other`] on load instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    Persona,
    SystemPrompt,
    Template,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Persona,
        Category::SystemPrompt,
        Category::Template,
        Category::Other,
    ];

    /// The label used in persisted documents and in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Category::Persona => "Persona",
            Category::SystemPrompt => "System Prompt",
            Category::Template => "Template",
            Category::Other => "Other",
        }
    }

    /// Maps a stored label onto a category, coercing unknown or legacy
    /// values to [`Category::Other`].
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Persona" => Category::Persona,
            "System Prompt" => Category::SystemPrompt,
            "Template" => Category::Template,
            _ => Category::Other,
        }
    }

    /// Strict, case-insensitive parse for user-typed input. `None` means
    /// the input named no known category.
    pub fn parse_input(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "persona" => Some(Category::Persona),
            "system prompt" | "system-prompt" | "system" => Some(Category::SystemPrompt),
            "template" => Some(Category::Template),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::from_label(&raw))
    }
}

fn default_version_number() -> u32 {
    1
}

/// A single stored prompt record.
///
/// `id` is globally unique and immutable. Version lineage is carried as
/// metadata on the record itself: all members of a lineage share a group id
/// and each non-initial version points back at its predecessor. Old
/// versions stay ordinary, searchable records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Category,
    /// Free-form label shown when `category` is [`Category::Other`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Lineage id shared by every version derived from one record.
    /// `None` means the record is its own lineage root; see [`Prompt::group_id`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_group_id: Option<Uuid>,
    #[serde(default = "default_version_number")]
    pub version_number: u32,
    /// Back-reference to the version this record was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_id: Option<Uuid>,
}

impl Prompt {
    pub fn new(name: String, content: String, category: Category) -> Prompt {
        let now = Utc::now();
        Prompt {
            id: Uuid::new_v4(),
            name,
            content,
            category,
            custom_category: None,
            tags: Vec::new(),
            pinned: false,
            sensitive: false,
            created_at: now,
            updated_at: now,
            version_group_id: None,
            version_number: 1,
            previous_version_id: None,
        }
    }

    /// The effective lineage id: the explicit group when one was assigned,
    /// otherwise the record's own id (a lineage of one).
    pub fn group_id(&self) -> Uuid {
        self.version_group_id.unwrap_or(self.id)
    }

    /// Bumps `updated_at`, marking the record as modified.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Repairs fields a legacy or hand-edited document may carry in an
    /// inconsistent state. Runs after every load and import.
    pub fn normalize(&mut self) {
        if self.version_number == 0 {
            self.version_number = 1;
        }
        if self.category != Category::Other {
            self.custom_category = None;
        } else if let Some(label) = &self.custom_category {
            if label.trim().is_empty() {
                self.custom_category = None;
            }
        }
    }
}

/// Content comparison form: line endings are normalized so a round-trip
/// through an editor that rewrites `\r\n` does not read as an edit.
pub(crate) fn canon_text(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Tag comparison form: a set of trimmed, non-empty tags.
pub(crate) fn canon_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Custom-category comparison form: only meaningful for `Other`, and an
/// empty label is the same as no label.
pub(crate) fn canon_custom_category(
    custom_category: Option<&str>,
    category: Category,
) -> Option<String> {
    if category != Category::Other {
        return None;
    }
    custom_category
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}
