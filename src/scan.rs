//! Content directory scanning and manifest generation.
//!
//! Stage 1 of the build pipeline. Reads the slide files of a content
//! directory and produces a [`DeckManifest`] that the render stage consumes.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                         # Content root
//! ├── config.toml                  # Deck configuration (optional)
//! ├── 010-introduction.md          # Slide 1
//! ├── 020-how-it-works.md          # Slide 2
//! ├── 030-in-the-lab.md            # Slide 3
//! └── speaker-notes.md             # Unnumbered: own page, not in the deck
//! ```
//!
//! ## Titles
//!
//! A slide whose first non-blank line is a `# heading` takes that heading as
//! its title, and the heading is removed from the body (pages render the title
//! themselves). Otherwise the title is the file name's display title. Only the
//! first line is considered, so a `# comment` inside a code block further
//! down never becomes a title.
//!
//! ## Validation
//!
//! - No two slides may share a number
//! - The deck must contain at least one numbered slide
//! - Unnumbered slugs `index` and `deck` are reserved for generated pages
//! - No two unnumbered slides may share a slug (slugs are lowercased, so
//!   `Notes.md` and `notes.md` collide)

use crate::config::{self, DeckConfig};
use crate::naming::parse_entry_name;
use crate::types::{DeckInfo, SlideEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Duplicate slide number {number}: {first} and {second}")]
    DuplicateNumber {
        number: u32,
        first: String,
        second: String,
    },
    #[error("No numbered slides (NNN-name.md) found in {0}")]
    NoSlides(PathBuf),
    #[error("Slide name '{0}' is reserved for a generated page")]
    ReservedSlug(String),
    #[error("Duplicate slide name '{slug}': {first} and {second}")]
    DuplicateSlug {
        slug: String,
        first: String,
        second: String,
    },
}

/// Manifest output from the scan stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckManifest {
    pub deck: DeckInfo,
    /// Deck slides in order, followed by unnumbered slides sorted by slug.
    pub slides: Vec<SlideEntry>,
    pub config: DeckConfig,
}

impl DeckManifest {
    /// Slides in the deck sequence.
    pub fn deck_slides(&self) -> impl Iterator<Item = &SlideEntry> {
        self.slides.iter().filter(|s| s.in_deck())
    }

    /// Unnumbered slides.
    pub fn extra_slides(&self) -> impl Iterator<Item = &SlideEntry> {
        self.slides.iter().filter(|s| !s.in_deck())
    }
}

const RESERVED_SLUGS: &[&str] = &["index", "deck"];

pub fn scan(root: &Path) -> Result<DeckManifest, ScanError> {
    let config = config::load_config(root)?;
    let slides = parse_slides(root)?;

    let slide_count = slides.iter().filter(|s| s.in_deck()).count();
    if slide_count == 0 {
        return Err(ScanError::NoSlides(root.to_path_buf()));
    }

    let deck = DeckInfo {
        title: config.deck.title.clone(),
        description: config.deck.description.clone(),
        lang: config.deck.lang.clone(),
        slide_count,
    };

    Ok(DeckManifest {
        deck,
        slides,
        config,
    })
}

/// Read every `.md` file in the content root into a slide entry.
fn parse_slides(root: &Path) -> Result<Vec<SlideEntry>, ScanError> {
    let mut md_files: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    md_files.sort();

    let mut numbered: BTreeMap<u32, SlideEntry> = BTreeMap::new();
    let mut extras: Vec<SlideEntry> = Vec::new();

    for md_path in &md_files {
        let source = md_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = md_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let parsed = parse_entry_name(&stem);

        let content = fs::read_to_string(md_path)?;
        let (heading, body) = split_title(&content);
        let title = heading.unwrap_or_else(|| parsed.display_title.clone());

        let entry = SlideEntry {
            number: parsed.number,
            position: None,
            slug: parsed.slug,
            title,
            source,
            body,
        };
        tracing::debug!(source = %entry.source, number = ?entry.number, "slide found");

        match parsed.number {
            Some(number) => {
                if let Some(existing) = numbered.get(&number) {
                    return Err(ScanError::DuplicateNumber {
                        number,
                        first: existing.source.clone(),
                        second: entry.source,
                    });
                }
                numbered.insert(number, entry);
            }
            None => {
                if RESERVED_SLUGS.contains(&entry.slug.as_str()) {
                    return Err(ScanError::ReservedSlug(entry.slug));
                }
                if let Some(existing) = extras.iter().find(|e| e.slug == entry.slug) {
                    return Err(ScanError::DuplicateSlug {
                        slug: entry.slug,
                        first: existing.source.clone(),
                        second: entry.source,
                    });
                }
                extras.push(entry);
            }
        }
    }

    extras.sort_by(|a, b| a.slug.cmp(&b.slug));

    let mut slides: Vec<SlideEntry> = numbered
        .into_values()
        .enumerate()
        .map(|(idx, mut entry)| {
            entry.position = Some(idx + 1);
            entry
        })
        .collect();
    slides.extend(extras);
    Ok(slides)
}

/// Split a leading `# heading` off a slide document.
///
/// Returns the heading text (if the first non-blank line is one) and the
/// remaining body.
pub fn split_title(content: &str) -> (Option<String>, String) {
    let mut lines = content.lines();
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(title) = line.strip_prefix("# ") {
            let title = title.trim().trim_end_matches('#').trim();
            if !title.is_empty() {
                let body: Vec<&str> = lines.collect();
                let body = body.join("\n");
                return (Some(title.to_string()), body.trim_start_matches('\n').to_string());
            }
        }
        break;
    }
    (None, content.to_string())
}
