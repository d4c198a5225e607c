//! Configuration file support for gloss
//!
//! Config file location: `~/.config/gloss/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [tooltip]
//! debounce_ms = 50
//! loading_delay_ms = 500
//!
//! [lookup]
//! latency_ms = 0
//! index_worktree = true
//!
//! [ui]
//! theme_mode = "dark"
//! ```

use gloss_core::TooltipConfig;
use ratatui::style::Color;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Dark or light palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

/// Resolved theme: all ratatui Colors ready to use
#[derive(Debug, Clone)]
pub struct Theme {
    pub text: Color,
    pub text_muted: Color,
    pub primary: Color,
    pub accent: Color,
    pub warning: Color,
    pub background_panel: Option<Color>,
    pub border_active: Color,

    // Diff
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_context: Color,
    pub diff_line_number: Color,
    pub diff_hunk_header: Color,

    // Tooltip anchors
    pub hover_bg: Color,
    pub docked_bg: Color,
    pub code: Color,
}

impl Theme {
    pub fn resolve(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self {
                text: Color::Rgb(0xd8, 0xde, 0xe9),
                text_muted: Color::Rgb(0x6b, 0x72, 0x80),
                primary: Color::Rgb(0x88, 0xc0, 0xd0),
                accent: Color::Rgb(0xb4, 0x8e, 0xad),
                warning: Color::Rgb(0xeb, 0xcb, 0x8b),
                background_panel: Some(Color::Rgb(0x2e, 0x34, 0x40)),
                border_active: Color::Rgb(0x81, 0xa1, 0xc1),
                diff_added: Color::Rgb(0xa3, 0xbe, 0x8c),
                diff_removed: Color::Rgb(0xbf, 0x61, 0x6a),
                diff_context: Color::Rgb(0xd8, 0xde, 0xe9),
                diff_line_number: Color::Rgb(0x4c, 0x56, 0x6a),
                diff_hunk_header: Color::Rgb(0x88, 0xc0, 0xd0),
                hover_bg: Color::Rgb(0x3b, 0x42, 0x52),
                docked_bg: Color::Rgb(0x5e, 0x81, 0xac),
                code: Color::Rgb(0xeb, 0xcb, 0x8b),
            },
            ThemeMode::Light => Self {
                text: Color::Rgb(0x2e, 0x34, 0x40),
                text_muted: Color::Rgb(0x8a, 0x90, 0x9c),
                primary: Color::Rgb(0x1f, 0x6f, 0xb2),
                accent: Color::Rgb(0x8a, 0x4f, 0x9e),
                warning: Color::Rgb(0xb0, 0x7d, 0x10),
                background_panel: Some(Color::Rgb(0xec, 0xef, 0xf4)),
                border_active: Color::Rgb(0x5e, 0x81, 0xac),
                diff_added: Color::Rgb(0x2f, 0x85, 0x3a),
                diff_removed: Color::Rgb(0xb3, 0x2d, 0x3a),
                diff_context: Color::Rgb(0x2e, 0x34, 0x40),
                diff_line_number: Color::Rgb(0xa0, 0xa8, 0xb4),
                diff_hunk_header: Color::Rgb(0x1f, 0x6f, 0xb2),
                hover_bg: Color::Rgb(0xd8, 0xde, 0xe9),
                docked_bg: Color::Rgb(0xa8, 0xc8, 0xe8),
                code: Color::Rgb(0x7a, 0x4d, 0x00),
            },
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::resolve(ThemeMode::Dark)
    }
}

/// Local lookup index configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Artificial latency added to every lookup (to see the loading state)
    pub latency_ms: u64,
    /// Also index the working-tree copies of changed files
    pub index_worktree: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            index_worktree: true,
        }
    }
}

impl LookupConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// UI configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// "dark" or "light"
    pub theme_mode: ThemeMode,
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tooltip: TooltipConfig,
    pub lookup: LookupConfig,
    pub ui: UiConfig,
}

impl Config {
    /// Get config file paths in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG_CONFIG_HOME (if set)
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("gloss").join("config.toml"));
        }

        // 2. ~/.config/gloss/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("gloss").join("config.toml"));
        }

        // 3. Platform-specific config dir (~/Library/Application Support on macOS)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("gloss").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    /// Load config from XDG config path
    /// Returns default config if file doesn't exist or can't be parsed
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(&path).ok())
            .and_then(|content| {
                Self::parse(&content)
                    .map_err(|e| {
                        eprintln!("Warning: Failed to parse config: {}", e);
                        e
                    })
                    .ok()
            })
            .unwrap_or_default()
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Default log file location: `$XDG_STATE_HOME/gloss/gloss.log`
pub fn default_log_path() -> Option<PathBuf> {
    if let Ok(state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(state).join("gloss").join("gloss.log"));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
        .map(|dir| dir.join("gloss").join("gloss.log"))
}
