//! Deck configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml              # Deck config (overrides stock defaults)
//! ├── 010-introduction.md
//! └── 020-how-it-works.md
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [deck]
//! title = "Slides"
//! description = ""
//! lang = "en"
//!
//! [highlight]
//! theme = "base16-ocean.dark"   # Any bundled syntect theme
//! line_numbers = true
//!
//! [diagrams.theme]
//! background = "#1a202c"
//! node_fill = "#2d3748"
//! node_border = "#7c3aed"
//! edge = "#5a67d8"
//! text = "#ffffff"
//! label_background = "#4a5568"
//!
//! [colors]
//! background = "#1a202c"
//! slide = "#2d3748"
//! text = "#f7fafc"
//! heading = "#ffffff"
//! accent = "#667eea"
//! muted = "#a0aec0"
//! border = "#4a5568"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::highlight;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Deck configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeckConfig {
    /// Title page metadata.
    pub deck: DeckMeta,
    /// Code block pretty-printing.
    pub highlight: HighlightConfig,
    /// Diagram rendering.
    pub diagrams: DiagramsConfig,
    /// Page colors.
    pub colors: ColorConfig,
    /// Parallel rendering settings.
    pub processing: ProcessingConfig,
}

impl DeckConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deck.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "deck.title must not be empty".into(),
            ));
        }
        if self.deck.lang.trim().is_empty() {
            return Err(ConfigError::Validation("deck.lang must not be empty".into()));
        }
        let themes = highlight::theme_names();
        if !themes.contains(&self.highlight.theme) {
            return Err(ConfigError::Validation(format!(
                "highlight.theme '{}' is not a bundled theme (available: {})",
                self.highlight.theme,
                themes.join(", ")
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Metadata shown on the title page and in every page's `<head>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeckMeta {
    pub title: String,
    pub description: String,
    /// `lang` attribute of generated pages.
    pub lang: String,
}

impl Default for DeckMeta {
    fn default() -> Self {
        Self {
            title: "Slides".to_string(),
            description: String::new(),
            lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// Name of a bundled syntect theme.
    pub theme: String,
    /// Prefix each highlighted line with its number.
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_numbers: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagramsConfig {
    pub theme: DiagramTheme,
}

/// Palette applied to every compiled diagram.
///
/// Read-only once loaded; handed to the diagram renderer at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagramTheme {
    /// Canvas behind the diagram.
    pub background: String,
    /// Node fill.
    pub node_fill: String,
    /// Node outline.
    pub node_border: String,
    /// Edge strokes and arrow heads.
    pub edge: String,
    /// Label text.
    pub text: String,
    /// Background of edge labels.
    pub label_background: String,
}

impl Default for DiagramTheme {
    fn default() -> Self {
        Self {
            background: "#1a202c".to_string(),
            node_fill: "#2d3748".to_string(),
            node_border: "#7c3aed".to_string(),
            edge: "#5a67d8".to_string(),
            text: "#ffffff".to_string(),
            label_background: "#4a5568".to_string(),
        }
    }
}

/// Page color scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    /// Page background behind the slides.
    pub background: String,
    /// Slide surface.
    pub slide: String,
    /// Body text.
    pub text: String,
    /// Headings.
    pub heading: String,
    /// Links, bullets and the active slide marker.
    pub accent: String,
    /// Secondary text (slide counter, description).
    pub muted: String,
    /// Table rules and separators.
    pub border: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: "#1a202c".to_string(),
            slide: "#2d3748".to_string(),
            text: "#f7fafc".to_string(),
            heading: "#ffffff".to_string(),
            accent: "#667eea".to_string(),
            muted: "#a0aec0".to_string(),
            border: "#4a5568".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(DeckConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<DeckConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: DeckConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Deck Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Deck metadata (title page and <head>)
# ---------------------------------------------------------------------------
[deck]
title = "Slides"
description = ""
lang = "en"

# ---------------------------------------------------------------------------
# Code blocks
# ---------------------------------------------------------------------------
[highlight]
# Bundled themes: base16-ocean.dark, base16-eighties.dark, base16-mocha.dark,
# base16-ocean.light, InspiredGitHub, Solarized (dark), Solarized (light)
theme = "base16-ocean.dark"

# Number every line of highlighted blocks.
line_numbers = true

# ---------------------------------------------------------------------------
# Diagrams (```mermaid blocks)
# ---------------------------------------------------------------------------
[diagrams.theme]
background = "#1a202c"
node_fill = "#2d3748"
node_border = "#7c3aed"
edge = "#5a67d8"
text = "#ffffff"
label_background = "#4a5568"

# ---------------------------------------------------------------------------
# Page colors
# ---------------------------------------------------------------------------
[colors]
background = "#1a202c"
slide = "#2d3748"
text = "#f7fafc"
heading = "#ffffff"
accent = "#667eea"
muted = "#a0aec0"
border = "#4a5568"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from the color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
    --color-bg: {background};
    --color-slide: {slide};
    --color-text: {text};
    --color-heading: {heading};
    --color-accent: {accent};
    --color-muted: {muted};
    --color-border: {border};
}}"#,
        background = colors.background,
        slide = colors.slide,
        text = colors.text,
        heading = colors.heading,
        accent = colors.accent,
        muted = colors.muted,
        border = colors.border,
    )
}
