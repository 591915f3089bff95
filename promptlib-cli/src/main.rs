//! promptlib command-line shell.
//!
//! The GUI-free application surface: loads the library, dispatches the
//! same named commands a palette would, and flushes pending drafts before
//! exit. Prompts are addressed by id or by name.

mod config;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use promptlib_core::app::AppState;
use promptlib_core::command::{CommandArgs, CommandRegistry};
use promptlib_core::json_storage::JsonStorage;
use promptlib_core::prompt::{Category, Prompt};
use promptlib_core::search::{Filter, SortOrder};
use tracing_subscriber::EnvFilter;

use crate::config::PromptlibConfig;

#[derive(Parser, Debug)]
#[command(
    version,
    name = "promptlib",
    bin_name = "promptlib",
    about = "A personal prompt library",
    long_about = "Store, search, version and fill a personal library of text prompts."
)]
struct Args {
    /// Override the data directory holding prompts.json and drafts.json
    #[arg(short = 'd', long)]
    data_dir: Option<String>,

    /// Keep the library files next to the application binary
    #[arg(long)]
    portable: bool,

    /// Start a fresh library when the document and all backups are corrupted
    #[arg(long)]
    start_empty: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Add a new prompt
    Add {
        #[arg(short = 'n', long)]
        name: String,
        #[arg(short = 'c', long, default_value = "")]
        content: String,
        /// Persona, System Prompt, Template or Other
        #[arg(long)]
        category: Option<String>,
        /// Free-form label shown for the Other category
        #[arg(long)]
        custom_category: Option<String>,
        #[arg(short = 't', long)]
        tags: Vec<String>,
    },
    /// List prompts, filtered and sorted
    List {
        /// Free-text query over name, content, category and tags
        #[arg(short = 'q', long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Keep prompts carrying any of these tags
        #[arg(short = 't', long)]
        tag: Vec<String>,
        /// Recently updated, Recently created or Name (A-Z)
        #[arg(long)]
        sort: Option<String>,
    },
    /// Print one prompt, optionally with placeholders filled
    Show {
        /// Prompt id or name
        prompt: String,
        /// Variable for placeholder fill, as key=value
        #[arg(short = 'v', long = "var")]
        vars: Vec<String>,
        /// Fill placeholders even when no variables are given
        #[arg(long)]
        fill: bool,
    },
    /// Change fields on a prompt and save
    Edit {
        /// Prompt id or name
        prompt: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'c', long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        custom_category: Option<String>,
        /// Replacement tag list, comma-separated
        #[arg(short = 't', long)]
        tags: Option<String>,
    },
    /// Pin or unpin a prompt
    Pin {
        /// Prompt id or name
        prompt: String,
    },
    /// Delete a prompt (one version only; siblings stay)
    Delete {
        /// Prompt id or name
        prompt: String,
    },
    /// Show the version history of a prompt's lineage
    Versions {
        /// Prompt id or name
        prompt: String,
    },
    /// Create a new version derived from a prompt
    NewVersion {
        /// Prompt id or name
        prompt: String,
    },
    /// Restore an old version as the new head of its chain
    Restore {
        /// Id of the version to restore
        version: String,
    },
    /// Import prompts from a JSON document, skipping existing ids
    Import { path: PathBuf },
    /// Export the whole library to a JSON document
    Export { path: PathBuf },
    /// List named commands, filtered palette-style
    Palette { query: Option<String> },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = config::load_or_exit();
    let data_dir = config::resolve_data_dir(args.data_dir.as_deref(), args.portable, &config);
    let storage = JsonStorage::new(data_dir);

    let mut state = match AppState::open(storage.clone()) {
        Ok(state) => state,
        Err(err) if args.start_empty => {
            eprintln!("warning: {err}; starting with an empty library");
            AppState::open_empty(storage)?
        }
        Err(err) => {
            return Err(anyhow!(
                "could not load the prompt library: {err} (pass --start-empty to begin a new one)"
            ));
        }
    };

    let registry = CommandRegistry::with_builtins();
    let result = run(&mut state, &registry, &config, args.cmd);
    state.close();
    result
}

fn run(
    state: &mut AppState,
    registry: &CommandRegistry,
    config: &PromptlibConfig,
    cmd: Commands,
) -> Result<()> {
    match cmd {
        Commands::Add {
            name,
            content,
            category,
            custom_category,
            tags,
        } => {
            let mut args = CommandArgs::new()
                .set("name", name)
                .set("content", content)
                .set_opt("category", category)
                .set_opt("custom_category", custom_category);
            if !tags.is_empty() {
                args = args.set("tags", tags.join(","));
            }
            let outcome = registry.dispatch(state, "prompt.new", &args)?;
            println!("{}", outcome.message);
            if let Some(id) = outcome.prompt_id {
                println!("id: {id}");
            }
        }

        Commands::List {
            query,
            category,
            tag,
            sort,
        } => {
            state.filter = Filter {
                query: query.unwrap_or_default(),
                category: category.as_deref().map(parse_category).transpose()?,
                tags: tag,
            };
            state.sort = SortOrder::from_label(sort.as_deref().unwrap_or(&config.sort_option));

            let visible = state.visible();
            if visible.is_empty() {
                println!("No prompts found.");
                return Ok(());
            }
            for prompt in visible {
                let pin = if prompt.pinned { "*" } else { " " };
                let sensitive = if prompt.sensitive { " (sensitive)" } else { "" };
                let tags = if prompt.tags.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", prompt.tags.join(", "))
                };
                println!(
                    "{pin} {:<28} {:<16} v{}{tags}{sensitive}",
                    prompt.name,
                    category_label(prompt),
                    prompt.version_number,
                );
            }
        }

        Commands::Show { prompt, vars, fill } => {
            let record = resolve(state, &prompt)?;
            let id = record.id;
            println!("name:     {}", record.name);
            println!("category: {}", category_label(record));
            if !record.tags.is_empty() {
                println!("tags:     {}", record.tags.join(", "));
            }
            println!("version:  {} (group {})", record.version_number, record.group_id());
            println!("updated:  {}", record.updated_at.format("%Y-%m-%d %H:%M:%S"));
            println!();
            if fill || !vars.is_empty() {
                let variables = parse_vars(&vars)?;
                println!("{}", state.render(id, &variables)?);
            } else {
                println!("{}", record.content);
            }
        }

        Commands::Edit {
            prompt,
            name,
            content,
            category,
            custom_category,
            tags,
        } => {
            let id = resolve(state, &prompt)?.id;
            let args = CommandArgs::new()
                .set("id", id.to_string())
                .set_opt("name", name)
                .set_opt("content", content)
                .set_opt("category", category)
                .set_opt("custom_category", custom_category)
                .set_opt("tags", tags);
            let outcome = registry.dispatch(state, "prompt.save", &args)?;
            println!("{}", outcome.message);
        }

        Commands::Pin { prompt } => {
            let id = resolve(state, &prompt)?.id;
            let args = CommandArgs::new().set("id", id.to_string());
            let outcome = registry.dispatch(state, "prompt.pin", &args)?;
            println!("{}", outcome.message);
        }

        Commands::Delete { prompt } => {
            let id = resolve(state, &prompt)?.id;
            let args = CommandArgs::new().set("id", id.to_string());
            let outcome = registry.dispatch(state, "prompt.delete", &args)?;
            println!("{}", outcome.message);
        }

        Commands::Versions { prompt } => {
            let id = resolve(state, &prompt)?.id;
            let chain = state.history_of(id)?;
            for (index, version) in chain.iter().enumerate() {
                let marker = if index == 0 { "head" } else { "    " };
                println!(
                    "{marker} v{:<3} {}  {}",
                    version.version_number,
                    version.id,
                    version.updated_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }

        Commands::NewVersion { prompt } => {
            let id = resolve(state, &prompt)?.id;
            let args = CommandArgs::new().set("id", id.to_string());
            let outcome = registry.dispatch(state, "version.create", &args)?;
            println!("{}", outcome.message);
            if let Some(id) = outcome.prompt_id {
                println!("id: {id}");
            }
        }

        Commands::Restore { version } => {
            let id = resolve(state, &version)?.id;
            let args = CommandArgs::new().set("id", id.to_string());
            let outcome = registry.dispatch(state, "version.restore", &args)?;
            println!("{}", outcome.message);
            if let Some(id) = outcome.prompt_id {
                println!("id: {id}");
            }
        }

        Commands::Import { path } => {
            let args = CommandArgs::new().set("path", path.display().to_string());
            let outcome = registry.dispatch(state, "library.import", &args)?;
            println!("{}", outcome.message);
        }

        Commands::Export { path } => {
            let args = CommandArgs::new().set("path", path.display().to_string());
            let outcome = registry.dispatch(state, "library.export", &args)?;
            println!("{}", outcome.message);
        }

        Commands::Palette { query } => {
            for command in registry.search(query.as_deref().unwrap_or("")) {
                println!("{:<18} {}", command.name, command.title);
            }
        }
    }

    Ok(())
}

fn resolve<'a>(state: &'a AppState, key: &str) -> Result<&'a Prompt> {
    state
        .resolve(key)
        .ok_or_else(|| anyhow!("no prompt matching '{key}'"))
}

/// The list/detail label for a prompt's category, carrying the free-form
/// custom label when the category is Other.
fn category_label(prompt: &Prompt) -> String {
    match (prompt.category, prompt.custom_category.as_deref()) {
        (Category::Other, Some(custom)) => format!("Other · {custom}"),
        _ => prompt.category.label().to_string(),
    }
}

fn parse_category(raw: &str) -> Result<Category> {
    Category::parse_input(raw).ok_or_else(|| {
        anyhow!(
            "'{raw}' is not a category; expected one of: {}",
            Category::ALL.map(|c| c.label()).join(", ")
        )
    })
}

fn parse_vars(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut variables = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("variable '{pair}' is not in key=value form"))?;
        variables.insert(key.to_string(), value.to_string());
    }
    Ok(variables)
}
