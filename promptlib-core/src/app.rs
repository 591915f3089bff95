//! Application state and handlers.
//!
//! One explicitly-owned [`AppState`] holds everything the UI shell needs:
//! the storage handle, the in-memory collection, the draft cache, the
//! current selection and the active filter. All mutations are synchronous
//! methods called from event handlers on the single UI thread; there is no
//! cross-process coordination between two running instances.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::drafts::{Draft, DraftCache};
use crate::json_storage::{JsonStorage, StorageError};
use crate::prompt::{Category, Prompt};
use crate::search::{Filter, SortOrder, filter_prompts, sort_prompts};
use crate::storage::{DocumentError, PromptStore, read_document, write_document};
use crate::template::{TemplateError, render_prompt};
use crate::versions;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("no prompt selected")]
    NoSelection,
    #[error("prompt not found: {0}")]
    NotFound(String),
}

pub struct AppState {
    storage: JsonStorage,
    pub prompts: Vec<Prompt>,
    pub drafts: DraftCache,
    pub selected: Option<Uuid>,
    pub filter: Filter,
    pub sort: SortOrder,
}

impl AppState {
    /// Loads the library and the draft cache. Corruption that no backup
    /// covers surfaces as an error here; see [`AppState::open_empty`] for
    /// the explicit start-over path.
    pub fn open(storage: JsonStorage) -> Result<AppState, AppError> {
        let prompts = storage.load()?;
        let drafts = DraftCache::open(storage.drafts_path());
        Ok(AppState {
            storage,
            prompts,
            drafts,
            selected: None,
            filter: Filter::default(),
            sort: SortOrder::default(),
        })
    }

    /// Starts with an empty collection, persisting it immediately. Only
    /// for the explicit last-resort path after recovery has failed and
    /// the user confirmed; the save still rotates the damaged document
    /// into a backup first.
    pub fn open_empty(storage: JsonStorage) -> Result<AppState, AppError> {
        let drafts = DraftCache::open(storage.drafts_path());
        let state = AppState {
            storage,
            prompts: Vec::new(),
            drafts,
            selected: None,
            filter: Filter::default(),
            sort: SortOrder::default(),
        };
        state.persist()?;
        Ok(state)
    }

    fn persist(&self) -> Result<(), AppError> {
        self.storage.save(&self.prompts)?;
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Resolves a user-supplied key: a full id, or a prompt name (the
    /// most recently updated record with that name wins).
    pub fn resolve(&self, key: &str) -> Option<&Prompt> {
        if let Ok(id) = Uuid::parse_str(key.trim()) {
            return self.get(id);
        }
        self.prompts
            .iter()
            .filter(|p| p.name == key)
            .max_by_key(|p| p.updated_at)
    }

    pub fn create_prompt(
        &mut self,
        name: String,
        content: String,
        category: Category,
        custom_category: Option<String>,
        tags: Vec<String>,
    ) -> Result<Uuid, AppError> {
        let mut prompt = Prompt::new(name, content, category);
        prompt.custom_category = custom_category;
        prompt.tags = tags;
        prompt.normalize();
        let id = prompt.id;
        self.prompts.push(prompt);
        self.persist()?;
        self.selected = Some(id);
        Ok(id)
    }

    pub fn select(&mut self, id: Uuid) -> Result<(), AppError> {
        if self.get(id).is_none() {
            return Err(AppError::NotFound(id.to_string()));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.selected.and_then(|id| self.get(id))
    }

    /// The state the editor should show for the selection: the saved
    /// record with any unsaved draft overlaid.
    pub fn editor_state(&self) -> Result<Draft, AppError> {
        let id = self.selected.ok_or(AppError::NoSelection)?;
        let prompt = self.get(id).ok_or(AppError::NotFound(id.to_string()))?;
        Ok(self
            .drafts
            .load_draft(id)
            .cloned()
            .unwrap_or_else(|| Draft::of(prompt)))
    }

    /// Feeds current editor state into dirty detection and the debounced
    /// draft autosave.
    pub fn edit_current(&mut self, mut draft: Draft) -> Result<(), AppError> {
        let id = self.selected.ok_or(AppError::NoSelection)?;
        let index = self
            .prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or(AppError::NotFound(id.to_string()))?;
        draft.prompt_id = id;
        self.drafts.save_draft(&self.prompts[index], draft);
        Ok(())
    }

    /// Whether the selection has uncommitted edits.
    pub fn is_dirty(&self) -> bool {
        self.selected
            .is_some_and(|id| self.drafts.load_draft(id).is_some())
    }

    /// Drives the debounced draft write; call this from the host loop's
    /// timer tick. Failures are logged, never fatal.
    pub fn tick(&mut self) {
        if let Err(err) = self.drafts.poll() {
            warn!(error = %err, "draft autosave failed");
        }
    }

    /// Commits the selection's draft (if any) into the record and
    /// persists the collection. A failing draft-cache cleanup is logged
    /// and does not block the save.
    pub fn save_current(&mut self) -> Result<(), AppError> {
        let id = self.selected.ok_or(AppError::NoSelection)?;
        let index = self
            .prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or(AppError::NotFound(id.to_string()))?;

        if let Some(draft) = self.drafts.load_draft(id).cloned() {
            draft.apply_to(&mut self.prompts[index]);
        } else {
            self.prompts[index].touch();
        }
        self.persist()?;

        if let Err(err) = self.drafts.clear_draft(id) {
            warn!(error = %err, "failed to clear draft after save");
        }
        Ok(())
    }

    /// Flips the pinned flag on the record itself; pinning is immediate,
    /// not part of the draft state. Returns the new flag.
    pub fn toggle_pin(&mut self, id: Uuid) -> Result<bool, AppError> {
        let index = self
            .prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or(AppError::NotFound(id.to_string()))?;
        self.prompts[index].pinned = !self.prompts[index].pinned;
        self.prompts[index].touch();
        self.persist()?;
        Ok(self.prompts[index].pinned)
    }

    pub fn delete_prompt(&mut self, id: Uuid) -> Result<(), AppError> {
        let before = self.prompts.len();
        self.prompts.retain(|p| p.id != id);
        if self.prompts.len() == before {
            return Err(AppError::NotFound(id.to_string()));
        }
        self.persist()?;
        if let Err(err) = self.drafts.clear_draft(id) {
            warn!(error = %err, "failed to clear draft after delete");
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(())
    }

    /// Appends a new version derived from the given record.
    pub fn create_version_of(&mut self, id: Uuid) -> Result<Uuid, AppError> {
        let source = self.get(id).ok_or(AppError::NotFound(id.to_string()))?;
        let version = versions::create_version(source, &self.prompts);
        let new_id = version.id;
        self.prompts.push(version);
        self.persist()?;
        Ok(new_id)
    }

    /// Restores an old version as the new head of its chain.
    pub fn restore_version(&mut self, version_id: Uuid) -> Result<Uuid, AppError> {
        let version = self
            .get(version_id)
            .ok_or(AppError::NotFound(version_id.to_string()))?;
        let restored = versions::restore(version, &self.prompts);
        let new_id = restored.id;
        self.prompts.push(restored);
        self.persist()?;
        self.selected = Some(new_id);
        Ok(new_id)
    }

    /// The lineage of the given record, newest first.
    pub fn history_of(&self, id: Uuid) -> Result<Vec<&Prompt>, AppError> {
        let prompt = self.get(id).ok_or(AppError::NotFound(id.to_string()))?;
        Ok(versions::history(prompt.group_id(), &self.prompts))
    }

    /// The filtered, sorted list the sidebar shows.
    pub fn visible(&self) -> Vec<&Prompt> {
        let mut prompts = filter_prompts(&self.prompts, &self.filter);
        sort_prompts(&mut prompts, self.sort);
        prompts
    }

    /// Merges an external document into the library, skipping records
    /// whose id already exists. Returns the number imported.
    pub fn import_from(&mut self, path: &Path) -> Result<usize, AppError> {
        let incoming = read_document(path)?;
        let existing: HashSet<Uuid> = self.prompts.iter().map(|p| p.id).collect();

        let mut imported = 0;
        for prompt in incoming {
            if !existing.contains(&prompt.id) {
                self.prompts.push(prompt);
                imported += 1;
            }
        }
        if imported > 0 {
            self.persist()?;
        }
        Ok(imported)
    }

    /// Exports the whole collection. Returns the number written.
    pub fn export_to(&self, path: &Path) -> Result<usize, AppError> {
        write_document(path, &self.prompts)?;
        Ok(self.prompts.len())
    }

    /// Fills a prompt's placeholders against the library.
    pub fn render(
        &self,
        id: Uuid,
        variables: &HashMap<String, String>,
    ) -> Result<String, AppError> {
        let prompt = self.get(id).ok_or(AppError::NotFound(id.to_string()))?;
        Ok(render_prompt(prompt, variables, &self.prompts)?)
    }

    /// Flushes any pending draft write before exit. Failures are logged;
    /// shutdown proceeds regardless.
    pub fn close(&mut self) {
        if let Err(err) = self.drafts.flush() {
            warn!(error = %err, "failed to flush drafts on close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open_state(dir: &TempDir) -> AppState {
        let storage = JsonStorage::new(dir.path());
        let mut state = AppState::open(storage).unwrap();
        // No quiet period in tests; flushes happen on close() anyway.
        state.drafts = DraftCache::open(dir.path().join("drafts.json"))
            .with_debounce(Duration::from_millis(0));
        state
    }

    fn add_prompt(state: &mut AppState, name: &str, content: &str) -> Uuid {
        state
            .create_prompt(
                name.to_string(),
                content.to_string(),
                Category::Other,
                None,
                Vec::new(),
            )
            .unwrap()
    }

    #[test]
    fn test_create_select_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let id = add_prompt(&mut state, "first", "hello");

        let mut draft = state.editor_state().unwrap();
        draft.content = "hello, edited".to_string();
        state.edit_current(draft).unwrap();
        assert!(state.is_dirty());

        state.save_current().unwrap();
        assert!(!state.is_dirty());

        let reopened = AppState::open(JsonStorage::new(dir.path())).unwrap();
        assert_eq!("hello, edited", reopened.get(id).unwrap().content);
    }

    #[test]
    fn test_pending_draft_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let id = add_prompt(&mut state, "draft_me", "saved body");

        let mut draft = state.editor_state().unwrap();
        draft.content = "unsaved body".to_string();
        state.edit_current(draft).unwrap();
        // App close flushes the pending debounce synchronously.
        state.close();
        drop(state);

        let mut reopened = AppState::open(JsonStorage::new(dir.path())).unwrap();
        assert_eq!("saved body", reopened.get(id).unwrap().content);
        reopened.select(id).unwrap();
        assert_eq!("unsaved body", reopened.editor_state().unwrap().content);
        assert!(reopened.is_dirty());
    }

    #[test]
    fn test_edit_then_revert_leaves_no_unsaved_state() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let _id = add_prompt(&mut state, "revert_me", "original");

        let mut draft = state.editor_state().unwrap();
        draft.content = "changed".to_string();
        state.edit_current(draft).unwrap();
        assert!(state.is_dirty());

        let mut reverted = state.editor_state().unwrap();
        reverted.content = "original".to_string();
        state.edit_current(reverted).unwrap();
        assert!(!state.is_dirty());

        state.close();
        let cache = DraftCache::open(dir.path().join("drafts.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_clears_selection_and_draft() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let id = add_prompt(&mut state, "doomed", "body");

        let mut draft = state.editor_state().unwrap();
        draft.content = "edited".to_string();
        state.edit_current(draft).unwrap();

        state.delete_prompt(id).unwrap();
        assert!(state.selected.is_none());
        assert!(state.prompts.is_empty());
        assert!(state.drafts.load_draft(id).is_none());

        assert!(matches!(
            state.delete_prompt(id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_version_create_and_restore() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let v1 = add_prompt(&mut state, "versioned", "first");

        // Edit and save, then branch a new version.
        let mut draft = state.editor_state().unwrap();
        draft.content = "second".to_string();
        state.edit_current(draft).unwrap();
        state.save_current().unwrap();

        let v2 = state.create_version_of(v1).unwrap();
        assert_ne!(v1, v2);
        let v2_record = state.get(v2).unwrap();
        assert_eq!(Some(v1), v2_record.previous_version_id);
        assert_eq!(2, v2_record.version_number);

        // Restore v1's content as a new head.
        let head = state.restore_version(v1).unwrap();
        let head_record = state.get(head).unwrap();
        assert_eq!(3, head_record.version_number);
        assert_eq!("second", head_record.content);

        let chain = state.history_of(v1).unwrap();
        assert_eq!(3, chain.len());
    }

    #[test]
    fn test_import_skips_existing_ids_and_coerces_categories() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let existing = add_prompt(&mut state, "already_here", "body");

        let import_path = dir.path().join("incoming.json");
        std::fs::write(
            &import_path,
            format!(
                r#"[
                    {{"id": "{existing}", "name": "dupe", "content": "x"}},
                    {{"name": "fresh", "content": "y", "category": "Totally Unknown"}}
                ]"#
            ),
        )
        .unwrap();

        let imported = state.import_from(&import_path).unwrap();
        assert_eq!(1, imported);
        assert_eq!(2, state.prompts.len());

        let fresh = state.resolve("fresh").unwrap();
        assert_eq!(Category::Other, fresh.category);
    }

    #[test]
    fn test_import_rejects_malformed_payload() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);

        let import_path = dir.path().join("broken.json");
        std::fs::write(&import_path, "this is not json").unwrap();

        assert!(matches!(
            state.import_from(&import_path),
            Err(AppError::Document(DocumentError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_export_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        add_prompt(&mut state, "a", "1");
        add_prompt(&mut state, "b", "2");

        let export_path = dir.path().join("export.json");
        assert_eq!(2, state.export_to(&export_path).unwrap());

        let loaded = read_document(&export_path).unwrap();
        assert_eq!(state.prompts, loaded);
    }

    #[test]
    fn test_render_with_variables_and_snippets() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        add_prompt(&mut state, "greeting", "Hello from the library!");
        let id = add_prompt(&mut state, "main", "{{snippet:greeting}} You are {{role}}.");

        let mut variables = HashMap::new();
        variables.insert("role".to_string(), "a reviewer".to_string());
        assert_eq!(
            "Hello from the library! You are a reviewer.",
            state.render(id, &variables).unwrap()
        );
    }

    #[test]
    fn test_resolve_by_name_prefers_newest() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        let old = add_prompt(&mut state, "shared", "old");
        let newer = state.create_version_of(old).unwrap();

        assert_eq!(newer, state.resolve("shared").unwrap().id);
        assert_eq!(old, state.resolve(&old.to_string()).unwrap().id);
        assert!(state.resolve("missing").is_none());
    }

    #[test]
    fn test_open_empty_preserves_corrupted_file_as_backup() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path());
        std::fs::write(storage.library_path(), "corrupted beyond repair").unwrap();

        assert!(AppState::open(storage.clone()).is_err());

        let state = AppState::open_empty(storage.clone()).unwrap();
        assert!(state.prompts.is_empty());
        // The damaged document was rotated into a backup, not destroyed.
        let backup = dir.path().join("prompts.json.bak.1");
        assert_eq!(
            "corrupted beyond repair",
            std::fs::read_to_string(backup).unwrap()
        );
    }

    #[test]
    fn test_visible_applies_filter_and_sort() {
        let dir = TempDir::new().unwrap();
        let mut state = open_state(&dir);
        add_prompt(&mut state, "alpha", "about rust");
        add_prompt(&mut state, "beta", "about cooking");

        state.filter.query = "rust".to_string();
        let visible = state.visible();
        assert_eq!(1, visible.len());
        assert_eq!("alpha", visible[0].name);
    }
}
