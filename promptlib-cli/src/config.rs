//! Application configuration.
//!
//! Stored through confy under the `promptlib` app name. The keys mirror
//! what the desktop shell persists: the data directory override, the list
//! sort option, theme and UI scale (kept for the GUI shell even though the
//! command-line shell ignores them), and the portable-mode switch that
//! keeps both library files next to the binary.

use std::env::home_dir;
use std::path::PathBuf;

use confy::ConfyError;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "promptlib";

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptlibConfig {
    /// Explicit data directory; empty/None falls through to portable mode
    /// or the home default.
    pub data_dir: Option<String>,
    pub sort_option: String,
    pub theme: String,
    pub ui_scale: String,
    /// Keep `prompts.json` and `drafts.json` next to the application
    /// binary instead of in the user directory.
    pub portable: bool,
}

impl Default for PromptlibConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sort_option: String::from("Recently updated"),
            theme: String::from("light"),
            ui_scale: String::from("auto"),
            portable: false,
        }
    }
}

pub fn load_or_exit() -> PromptlibConfig {
    let config: Result<PromptlibConfig, ConfyError> = confy::load(APP_NAME, None);
    match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: problem loading config: {err}. Exiting...");
            std::process::exit(exitcode::CONFIG);
        }
    }
}

/// Resolves the data directory: explicit flag, then the configured
/// override, then portable mode, then a home-directory default.
pub fn resolve_data_dir(
    flag: Option<&str>,
    portable_flag: bool,
    config: &PromptlibConfig,
) -> PathBuf {
    if let Some(dir) = flag {
        return PathBuf::from(dir);
    }
    if let Some(dir) = config.data_dir.as_deref() {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    if portable_flag || config.portable {
        if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(PathBuf::from)) {
            return dir.join("data");
        }
    }
    home_dir()
        .map(|p| p.join("promptlib").join("library"))
        .unwrap_or_else(|| PathBuf::from("promptlib/library"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_everything() {
        let config = PromptlibConfig {
            data_dir: Some("/from/config".to_string()),
            portable: true,
            ..PromptlibConfig::default()
        };
        assert_eq!(
            PathBuf::from("/from/flag"),
            resolve_data_dir(Some("/from/flag"), true, &config)
        );
    }

    #[test]
    fn test_config_dir_wins_over_portable() {
        let config = PromptlibConfig {
            data_dir: Some("/from/config".to_string()),
            portable: true,
            ..PromptlibConfig::default()
        };
        assert_eq!(
            PathBuf::from("/from/config"),
            resolve_data_dir(None, false, &config)
        );
    }

    #[test]
    fn test_blank_config_dir_is_ignored() {
        let config = PromptlibConfig {
            data_dir: Some("   ".to_string()),
            ..PromptlibConfig::default()
        };
        let resolved = resolve_data_dir(None, false, &config);
        assert_ne!(PathBuf::from("   "), resolved);
    }

    #[test]
    fn test_portable_mode_sits_next_to_the_binary() {
        let config = PromptlibConfig::default();
        let resolved = resolve_data_dir(None, true, &config);
        assert!(resolved.ends_with("data"));
    }
}
