//! Shared types used across pipeline stages.
//!
//! These types are serialized to JSON between stages (scan → render → generate)
//! and must stay identical across all three modules.

use crate::naming;
use serde::{Deserialize, Serialize};

/// Deck-level metadata shown on the title page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckInfo {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub lang: String,
    /// Number of slides in the deck sequence (unnumbered slides excluded).
    pub slide_count: usize,
}

/// One slide file from the content directory.
///
/// - Numbered files (`NNN-name.md`) join the deck sequence, sorted by number
/// - Unnumbered files are rendered to their own page but left out of the deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    /// Number prefix of the file name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// 1-based position in the deck; `None` for unnumbered slides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub slug: String,
    /// Leading `# heading` of the file, or the display title of its name.
    pub title: String,
    /// File name relative to the content directory.
    pub source: String,
    /// Markdown with the title heading removed.
    pub body: String,
}

impl SlideEntry {
    pub fn in_deck(&self) -> bool {
        self.position.is_some()
    }

    /// Output file name under `dist/`.
    pub fn page_name(&self) -> String {
        match self.position {
            Some(position) => naming::deck_page_name(position),
            None => naming::extra_page_name(&self.slug),
        }
    }
}
