//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--hidden`, `--no-preview`, etc.)
//! 2. `$MES_CONFIG` environment variable (path to config file)
//! 3. Project-local `.mes.toml` in the current working directory
//! 4. Global `~/.config/mes/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::listing::SortBy;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Starting directory (overridden by CLI positional arg).
    pub default_path: Option<String>,
    /// Show hidden files by default.
    pub show_hidden: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Maximum delay between two clicks on the same row to count as a double click.
    pub double_click_ms: Option<u64>,
}

/// Directory listing settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ListingConfig {
    /// Sort order: "name", "size", "modified".
    pub sort_by: Option<String>,
    /// Directories always listed first.
    pub dirs_first: Option<bool>,
    /// How many visited directories "go back" remembers.
    pub history_depth: Option<usize>,
}

/// Recursive search bounds.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SearchConfig {
    /// Deepest directory level visited below the current directory.
    pub max_depth: Option<usize>,
    /// Maximum number of matches kept per query.
    pub max_results: Option<usize>,
    /// Maximum number of entries collected by one walk.
    pub max_scanned: Option<usize>,
    /// Descend into symlinked directories (cycles are still skipped).
    pub follow_symlinks: Option<bool>,
}

/// Preview panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PreviewConfig {
    /// Whether the preview panel is enabled.
    pub enabled: Option<bool>,
    /// Maximum number of lines shown for a text file or directory.
    pub max_lines: Option<usize>,
    /// Bytes read from the head of a text file.
    pub max_bytes: Option<u64>,
    /// Syntax highlighting theme (syntect theme name).
    pub syntax_theme: Option<String>,
}

/// External editor settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor command; falls back to `$VISUAL`, `$EDITOR`, then nvim/vim/vi.
    pub command: Option<String>,
}

/// Log file settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: Option<bool>,
    /// Default filter directive when `$MES_LOG` is unset.
    pub level: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub listing: ListingConfig,
    pub search: SearchConfig,
    pub preview: PreviewConfig,
    pub editor: EditorConfig,
    pub logging: LoggingConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

pub const DEFAULT_DOUBLE_CLICK_MS: u64 = 500;
pub const DEFAULT_HISTORY_DEPTH: usize = 64;
pub const DEFAULT_SEARCH_MAX_DEPTH: usize = 3;
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 100;
pub const DEFAULT_SEARCH_MAX_SCANNED: usize = 20_000;
pub const DEFAULT_PREVIEW_MAX_LINES: usize = 50;
/// Bytes read for a text preview (4 KiB).
pub const DEFAULT_PREVIEW_MAX_BYTES: u64 = 4_096;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ── Core-facing views ────────────────────────────────────────────────────────

/// UI preferences threaded through the explorer core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub show_hidden: bool,
    pub sort_by: SortBy,
    pub dirs_first: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_hidden: false,
            sort_by: SortBy::Name,
            dirs_first: true,
        }
    }
}

/// Bounds applied to a recursive search walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: usize,
    pub max_results: usize,
    pub max_scanned: usize,
    pub follow_symlinks: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_SEARCH_MAX_DEPTH,
            max_results: DEFAULT_SEARCH_MAX_RESULTS,
            max_scanned: DEFAULT_SEARCH_MAX_SCANNED,
            follow_symlinks: true,
        }
    }
}

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("MES_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".mes.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("mes").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
///
/// Config is read before the log file exists, so parse failures go to stderr.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_path: other
                    .general
                    .default_path
                    .clone()
                    .or(self.general.default_path),
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                mouse: other.general.mouse.or(self.general.mouse),
                double_click_ms: other
                    .general
                    .double_click_ms
                    .or(self.general.double_click_ms),
            },
            listing: ListingConfig {
                sort_by: other.listing.sort_by.clone().or(self.listing.sort_by),
                dirs_first: other.listing.dirs_first.or(self.listing.dirs_first),
                history_depth: other.listing.history_depth.or(self.listing.history_depth),
            },
            search: SearchConfig {
                max_depth: other.search.max_depth.or(self.search.max_depth),
                max_results: other.search.max_results.or(self.search.max_results),
                max_scanned: other.search.max_scanned.or(self.search.max_scanned),
                follow_symlinks: other
                    .search
                    .follow_symlinks
                    .or(self.search.follow_symlinks),
            },
            preview: PreviewConfig {
                enabled: other.preview.enabled.or(self.preview.enabled),
                max_lines: other.preview.max_lines.or(self.preview.max_lines),
                max_bytes: other.preview.max_bytes.or(self.preview.max_bytes),
                syntax_theme: other
                    .preview
                    .syntax_theme
                    .clone()
                    .or(self.preview.syntax_theme),
            },
            editor: EditorConfig {
                command: other.editor.command.clone().or(self.editor.command),
            },
            logging: LoggingConfig {
                enabled: other.logging.enabled.or(self.logging.enabled),
                level: other.logging.level.clone().or(self.logging.level),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that the highest-priority candidate is merged last.
        let paths = candidate_paths();
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    pub fn double_click_ms(&self) -> u64 {
        self.general.double_click_ms.unwrap_or(DEFAULT_DOUBLE_CLICK_MS)
    }

    /// Sort mode: "name", "size", or "modified".
    pub fn sort_by(&self) -> &str {
        self.listing.sort_by.as_deref().unwrap_or("name")
    }

    pub fn dirs_first(&self) -> bool {
        self.listing.dirs_first.unwrap_or(true)
    }

    pub fn history_depth(&self) -> usize {
        self.listing
            .history_depth
            .unwrap_or(DEFAULT_HISTORY_DEPTH)
            .max(1)
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview.enabled.unwrap_or(true)
    }

    pub fn preview_max_lines(&self) -> usize {
        self.preview.max_lines.unwrap_or(DEFAULT_PREVIEW_MAX_LINES)
    }

    pub fn preview_max_bytes(&self) -> u64 {
        self.preview.max_bytes.unwrap_or(DEFAULT_PREVIEW_MAX_BYTES)
    }

    /// Syntax highlighting theme name.
    pub fn syntax_theme_name(&self) -> &str {
        self.preview
            .syntax_theme
            .as_deref()
            .unwrap_or("base16-ocean.dark")
    }

    pub fn editor_command(&self) -> Option<&str> {
        self.editor.command.as_deref()
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.enabled.unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Preferences handed to the explorer core.
    pub fn preferences(&self) -> Preferences {
        Preferences {
            show_hidden: self.show_hidden(),
            sort_by: SortBy::from_str(self.sort_by()),
            dirs_first: self.dirs_first(),
        }
    }

    /// Recursive search bounds handed to the explorer core.
    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            max_depth: self.search.max_depth.unwrap_or(DEFAULT_SEARCH_MAX_DEPTH),
            max_results: self
                .search
                .max_results
                .unwrap_or(DEFAULT_SEARCH_MAX_RESULTS)
                .max(1),
            max_scanned: self
                .search
                .max_scanned
                .unwrap_or(DEFAULT_SEARCH_MAX_SCANNED)
                .max(1),
            follow_symlinks: self.search.follow_symlinks.unwrap_or(true),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
