//! # promptlib Core
//!
//! This crate provides the core functionality for promptlib, a personal
//! prompt library: storing, searching, versioning and editing a collection
//! of text prompts persisted as a JSON document.
//!
//! # Modules
//!
//! - [`prompt`] - Prompt records and categories
//! - [`storage`] - Storage trait and import/export documents
//! - [`json_storage`] - JSON store with atomic saves and rotating backups
//! - [`drafts`] - Debounced, restart-surviving draft cache
//! - [`versions`] - Version chains (create, restore, history)
//! - [`search`] - List filtering and sorting
//! - [`parser`] - Placeholder syntax parsing
//! - [`template`] - Variable fill and snippet splicing
//! - [`command`] - Named commands dispatched by surfaces
//! - [`app`] - The explicitly-owned application state
//!
//! # Examples
//!
//! ```rust
//! use promptlib_core::json_storage::JsonStorage;
//! use promptlib_core::prompt::{Category, Prompt};
//! use promptlib_core::storage::PromptStore;
//! use tempfile::TempDir;
//!
//! // Create a temporary data directory
//! let temp_dir = TempDir::new().unwrap();
//! let storage = JsonStorage::new(temp_dir.path());
//!
//! // Create a prompt and save the collection
//! let prompt = Prompt::new(
//!     "greeting".to_string(),
//!     "Hello, world!".to_string(),
//!     Category::Persona,
//! );
//! storage.save(&[prompt]).expect("Failed to save library");
//!
//! let loaded = storage.load().expect("Failed to load library");
//! assert_eq!(1, loaded.len());
//! assert_eq!("greeting", loaded[0].name);
//! ```

pub mod app;
pub mod command;
pub mod drafts;
pub mod json_storage;
pub mod parser;
pub mod prompt;
pub mod search;
pub mod storage;
pub mod template;
pub mod versions;
