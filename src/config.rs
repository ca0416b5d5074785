//! Configuration file support for podcast-tracker.
//!
//! This module loads and saves user preferences from a TOML configuration
//! file. Every field has a default, so a partial file is valid.

use crate::error::{AppError, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Podcast Tracker server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Seconds between automatic reloads of the current page
    #[serde(default = "default_auto_refresh_secs")]
    pub auto_refresh_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Command used to open episode links (overrides platform default)
    #[serde(default)]
    pub opener: Option<String>,

    /// Where the export key writes the current page as HTML
    #[serde(default = "default_export_path")]
    pub export_path: String,

    /// Key bindings for the terminal UI
    #[serde(default)]
    pub keybindings: Keybindings,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_auto_refresh_secs() -> u64 {
    5 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_export_path() -> String {
    "podcast-tracker.html".to_string()
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self {
            server_url: default_server_url(),
            auto_refresh_secs: default_auto_refresh_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            opener: None,
            export_path: default_export_path(),
            keybindings: Keybindings::default(),
        }
    }

    /// Interval of the periodic reload. Never shorter than one second.
    pub fn auto_refresh(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Get the path to the config file.
    ///
    /// Returns ~/.config/podcast-tracker/config.toml on Linux,
    /// or a platform-appropriate location on other systems.
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
            .join("podcast-tracker");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load config from `path`, falling back to defaults when it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Create a default config file if one doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn create_default_if_missing() -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        Self::create_default_at(&path)?;
        Ok(path)
    }

    /// Write the defaults to `path` unless a file is already there. Returns
    /// whether a file was written.
    pub fn create_default_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::new().save_to(path)?;
        Ok(true)
    }
}

/// Key bindings, each action accepting several keys.
///
/// Keys are written as a character (`"j"`), a named key (`"Down"`,
/// `"Enter"`, `"PageUp"`, `"F5"`), optionally prefixed with `ctrl+`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub select: Vec<String>,
    pub toggle_focus: Vec<String>,
    pub next_page: Vec<String>,
    pub previous_page: Vec<String>,
    pub mark_listened: Vec<String>,
    pub refresh: Vec<String>,
    pub open: Vec<String>,
    pub export: Vec<String>,
    pub help: Vec<String>,
    pub quit: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: keys(&["k", "Up"]),
            down: keys(&["j", "Down"]),
            select: keys(&["Enter"]),
            toggle_focus: keys(&["Tab"]),
            next_page: keys(&["n", "Right", "PageDown"]),
            previous_page: keys(&["p", "Left", "PageUp"]),
            mark_listened: keys(&["m", "Space"]),
            refresh: keys(&["r", "F5"]),
            open: keys(&["o"]),
            export: keys(&["e"]),
            help: keys(&["?"]),
            quit: keys(&["q"]),
        }
    }
}

impl Keybindings {
    /// Whether `key` triggers any of the keys in `binding`.
    pub fn matches(&self, binding: &[String], key: &KeyEvent) -> bool {
        binding
            .iter()
            .filter_map(|raw| parse_key(raw))
            .any(|(code, modifiers)| {
                code == key.code
                    && key.modifiers.contains(KeyModifiers::CONTROL)
                        == modifiers.contains(KeyModifiers::CONTROL)
            })
    }

    /// First key of a binding, for help texts.
    pub fn label(binding: &[String]) -> &str {
        binding.first().map(|s| s.as_str()).unwrap_or("-")
    }
}

/// Parse a key description such as `"ctrl+r"` or `"PageDown"`.
pub fn parse_key(raw: &str) -> Option<(KeyCode, KeyModifiers)> {
    let (modifiers, name) = match raw.strip_prefix("ctrl+") {
        Some(rest) => (KeyModifiers::CONTROL, rest),
        None => (KeyModifiers::NONE, raw),
    };

    let code = match name {
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "Esc" => KeyCode::Esc,
        "Backspace" => KeyCode::Backspace,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "Space" => KeyCode::Char(' '),
        other if other.len() > 1 && other.starts_with('F') => {
            KeyCode::F(other[1..].parse().ok()?)
        }
        other => {
            let mut chars = other.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            KeyCode::Char(c)
        }
    };

    Some((code, modifiers))
}
