//! Named commands over the application state.
//!
//! UI surfaces (palette, menus, shortcuts, the CLI shell) never wire
//! callbacks into widgets directly; they dispatch a [`Command`] by its
//! stable name with string arguments. That keeps every action testable
//! without a toolkit and gives the palette one list to filter.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::app::{AppError, AppState};
use crate::drafts::Draft;
use crate::prompt::Category;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("missing argument '{0}'")]
    MissingArg(String),
    #[error("invalid argument '{key}': {message}")]
    InvalidArg { key: String, message: String },
    #[error(transparent)]
    App(#[from] AppError),
}

/// String arguments for a dispatch, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    values: HashMap<String, String>,
}

impl CommandArgs {
    pub fn new() -> CommandArgs {
        CommandArgs::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> CommandArgs {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt(self, key: &str, value: Option<impl Into<String>>) -> CommandArgs {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, CommandError> {
        self.get(key)
            .ok_or_else(|| CommandError::MissingArg(key.to_string()))
    }

    pub fn require_id(&self, key: &str) -> Result<Uuid, CommandError> {
        let raw = self.require(key)?;
        Uuid::parse_str(raw.trim()).map_err(|_| CommandError::InvalidArg {
            key: key.to_string(),
            message: format!("'{raw}' is not a valid id"),
        })
    }
}

/// What a handler reports back to the surface that dispatched it.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub message: String,
    pub prompt_id: Option<Uuid>,
}

impl CommandOutcome {
    fn new(message: impl Into<String>) -> CommandOutcome {
        CommandOutcome {
            message: message.into(),
            prompt_id: None,
        }
    }

    fn with_prompt(mut self, id: Uuid) -> CommandOutcome {
        self.prompt_id = Some(id);
        self
    }
}

type Handler = fn(&mut AppState, &CommandArgs) -> Result<CommandOutcome, CommandError>;

/// A named action, decoupled from any widget toolkit.
pub struct Command {
    pub name: &'static str,
    pub title: &'static str,
    handler: Handler,
}

pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn with_builtins() -> CommandRegistry {
        CommandRegistry {
            commands: vec![
                Command {
                    name: "prompt.new",
                    title: "New prompt",
                    handler: cmd_prompt_new,
                },
                Command {
                    name: "prompt.save",
                    title: "Save prompt",
                    handler: cmd_prompt_save,
                },
                Command {
                    name: "prompt.delete",
                    title: "Delete prompt",
                    handler: cmd_prompt_delete,
                },
                Command {
                    name: "prompt.pin",
                    title: "Pin or unpin prompt",
                    handler: cmd_prompt_pin,
                },
                Command {
                    name: "version.create",
                    title: "Create new version",
                    handler: cmd_version_create,
                },
                Command {
                    name: "version.restore",
                    title: "Restore version",
                    handler: cmd_version_restore,
                },
                Command {
                    name: "library.import",
                    title: "Import prompts",
                    handler: cmd_library_import,
                },
                Command {
                    name: "library.export",
                    title: "Export prompts",
                    handler: cmd_library_export,
                },
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Palette-style lookup: case-insensitive substring over name and
    /// title. An empty query lists everything.
    pub fn search(&self, query: &str) -> Vec<&Command> {
        let query = query.trim().to_lowercase();
        self.commands
            .iter()
            .filter(|c| {
                query.is_empty()
                    || c.name.to_lowercase().contains(&query)
                    || c.title.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn dispatch(
        &self,
        state: &mut AppState,
        name: &str,
        args: &CommandArgs,
    ) -> Result<CommandOutcome, CommandError> {
        let command = self
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        (command.handler)(state, args)
    }
}

fn parse_category(args: &CommandArgs) -> Result<Category, CommandError> {
    match args.get("category") {
        None => Ok(Category::Other),
        Some(raw) => Category::parse_input(raw).ok_or_else(|| CommandError::InvalidArg {
            key: "category".to_string(),
            message: format!(
                "'{raw}' is not one of: {}",
                Category::ALL.map(|c| c.label()).join(", ")
            ),
        }),
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn cmd_prompt_new(state: &mut AppState, args: &CommandArgs) -> Result<CommandOutcome, CommandError> {
    let name = args.require("name")?.to_string();
    let content = args.get("content").unwrap_or_default().to_string();
    let category = parse_category(args)?;
    let custom_category = args.get("custom_category").map(str::to_string);
    let tags = args.get("tags").map(split_tags).unwrap_or_default();

    let id = state.create_prompt(name.clone(), content, category, custom_category, tags)?;
    Ok(CommandOutcome::new(format!("Created prompt '{name}'")).with_prompt(id))
}

fn cmd_prompt_save(
    state: &mut AppState,
    args: &CommandArgs,
) -> Result<CommandOutcome, CommandError> {
    let id = args.require_id("id")?;
    state.select(id)?;

    let mut draft: Draft = state.editor_state()?;
    if let Some(name) = args.get("name") {
        draft.name = name.to_string();
    }
    if let Some(content) = args.get("content") {
        draft.content = content.to_string();
    }
    if args.get("category").is_some() {
        draft.category = parse_category(args)?;
    }
    if let Some(custom) = args.get("custom_category") {
        draft.custom_category = Some(custom.to_string());
    }
    if let Some(tags) = args.get("tags") {
        draft.tags = split_tags(tags);
    }

    state.edit_current(draft)?;
    state.save_current()?;
    Ok(CommandOutcome::new("Changes saved").with_prompt(id))
}

fn cmd_prompt_delete(
    state: &mut AppState,
    args: &CommandArgs,
) -> Result<CommandOutcome, CommandError> {
    let id = args.require_id("id")?;
    state.delete_prompt(id)?;
    Ok(CommandOutcome::new("Prompt deleted"))
}

fn cmd_prompt_pin(state: &mut AppState, args: &CommandArgs) -> Result<CommandOutcome, CommandError> {
    let id = args.require_id("id")?;
    let pinned = state.toggle_pin(id)?;
    Ok(
        CommandOutcome::new(if pinned { "Prompt pinned" } else { "Prompt unpinned" })
            .with_prompt(id),
    )
}

fn cmd_version_create(
    state: &mut AppState,
    args: &CommandArgs,
) -> Result<CommandOutcome, CommandError> {
    let id = args.require_id("id")?;
    let new_id = state.create_version_of(id)?;
    let number = state.get(new_id).map(|p| p.version_number).unwrap_or(0);
    Ok(CommandOutcome::new(format!("Created version {number}")).with_prompt(new_id))
}

fn cmd_version_restore(
    state: &mut AppState,
    args: &CommandArgs,
) -> Result<CommandOutcome, CommandError> {
    let id = args.require_id("id")?;
    let new_id = state.restore_version(id)?;
    Ok(CommandOutcome::new("Version restored as new head").with_prompt(new_id))
}

fn cmd_library_import(
    state: &mut AppState,
    args: &CommandArgs,
) -> Result<CommandOutcome, CommandError> {
    let path = args.require("path")?;
    let imported = state.import_from(std::path::Path::new(path))?;
    Ok(CommandOutcome::new(format!("Imported {imported} prompts")))
}

fn cmd_library_export(
    state: &mut AppState,
    args: &CommandArgs,
) -> Result<CommandOutcome, CommandError> {
    let path = args.require("path")?;
    let exported = state.export_to(std::path::Path::new(path))?;
    Ok(CommandOutcome::new(format!("Exported {exported} prompts")))
}
