//! Filtering and sorting for the prompt list.
//!
//! Everything here is a linear scan over the in-memory collection; the
//! library is small by design and the list is rebuilt on every keystroke.

use crate::prompt::{Category, Prompt};

/// Active list filter: free-text query, optional category, optional tags.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub query: String,
    pub category: Option<Category>,
    pub tags: Vec<String>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.category.is_none() && self.tags.is_empty()
    }

    pub fn matches(&self, prompt: &Prompt) -> bool {
        if let Some(category) = self.category {
            if prompt.category != category {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let any_tag = self
                .tags
                .iter()
                .any(|tag| prompt.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)));
            if !any_tag {
                return false;
            }
        }

        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        prompt.name.to_lowercase().contains(&query)
            || prompt.content.to_lowercase().contains(&query)
            || prompt.category.label().to_lowercase().contains(&query)
            || prompt
                .custom_category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&query))
            || prompt
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&query))
    }
}

/// List sort orders. Pinned prompts always sort ahead of the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    RecentlyUpdated,
    RecentlyCreated,
    Name,
}

impl SortOrder {
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::RecentlyUpdated => "Recently updated",
            SortOrder::RecentlyCreated => "Recently created",
            SortOrder::Name => "Name (A-Z)",
        }
    }

    /// Maps a stored sort-option label to an order, defaulting to
    /// recently-updated for anything unrecognized.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "recently created" | "created" => SortOrder::RecentlyCreated,
            "name (a-z)" | "name" => SortOrder::Name,
            _ => SortOrder::RecentlyUpdated,
        }
    }
}

pub fn filter_prompts<'a>(library: &'a [Prompt], filter: &Filter) -> Vec<&'a Prompt> {
    library.iter().filter(|p| filter.matches(p)).collect()
}

pub fn sort_prompts(prompts: &mut [&Prompt], order: SortOrder) {
    prompts.sort_by(|a, b| {
        b.pinned.cmp(&a.pinned).then_with(|| match order {
            SortOrder::RecentlyUpdated => b.updated_at.cmp(&a.updated_at),
            SortOrder::RecentlyCreated => b.created_at.cmp(&a.created_at),
            SortOrder::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        })
    });
}
