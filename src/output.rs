//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every slide is shown
//! by its deck position and title, with the source file as an indented
//! `Source:` context line. Unnumbered slides have no position and are listed
//! under their own heading.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Slides
//! 001 Editing Life
//!     Source: 010-editing-life.md
//! 002 What is CRISPR?
//!     Source: 020-what-is-crispr.md
//!
//! Extra
//!     Speaker Notes
//!         Source: speaker-notes.md
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Render
//!
//! ```text
//! 003 How Cas9 Cuts
//!     Source: 030-how-cas9-cuts.md
//!     1 diagram, 0 code blocks
//!     diagram-0 failed: dangling edge
//! Rendered 6 slides: 2 diagrams (1 failed), 3 code blocks
//! Cache: 1 cached, 1 compiled (2 total)
//! ```
//!
//! ## Generate
//!
//! ```text
//! Title page → index.html
//! 001 Editing Life → 1.html
//! 002 What is CRISPR? → 2.html
//!
//! Extra
//!     Speaker Notes → speaker-notes.html
//!
//! Whole deck → deck.html
//! Generated 5 slide pages, 1 extra page
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::cache::CacheStats;
use crate::generate::GeneratedPage;
use crate::render::{RenderEvent, RenderedDeck};
use crate::scan::DeckManifest;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Slide header: deck position + title, or indented title for extras.
///
/// ```text
/// 003 How Cas9 Cuts
///     Speaker Notes
/// ```
fn slide_header(position: Option<usize>, title: &str) -> String {
    match position {
        Some(pos) => format!("{} {}", format_index(pos), title),
        None => format!("{}{}", indent(1), title),
    }
}

/// `1 diagram`, `2 diagrams`, `0 code blocks`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

// ============================================================================
// Stage 1: Scan output
// ============================================================================

/// Format scan stage output showing the discovered deck.
pub fn format_scan_output(manifest: &DeckManifest, has_config_file: bool) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Slides".to_string());
    for slide in manifest.deck_slides() {
        lines.push(slide_header(slide.position, &slide.title));
        lines.push(format!("{}Source: {}", indent(1), slide.source));
    }

    let extras: Vec<_> = manifest.extra_slides().collect();
    if !extras.is_empty() {
        lines.push(String::new());
        lines.push("Extra".to_string());
        for slide in extras {
            lines.push(slide_header(None, &slide.title));
            lines.push(format!("{}Source: {}", indent(2), slide.source));
        }
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if has_config_file {
        lines.push(format!("{}config.toml", indent(1)));
    } else {
        lines.push(format!("{}(stock defaults)", indent(1)));
    }

    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(manifest: &DeckManifest, has_config_file: bool) {
    for line in format_scan_output(manifest, has_config_file) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Render output
// ============================================================================

/// Format a single render progress event as display lines.
pub fn format_render_event(event: &RenderEvent) -> Vec<String> {
    match event {
        RenderEvent::SlideRendered {
            position,
            title,
            source,
            diagrams,
            code_blocks,
            failures,
        } => {
            let depth = if position.is_some() { 1 } else { 2 };
            let mut lines = vec![
                slide_header(*position, title),
                format!("{}Source: {}", indent(depth), source),
            ];
            if *diagrams > 0 || *code_blocks > 0 {
                lines.push(format!(
                    "{}{}, {}",
                    indent(depth),
                    count(*diagrams, "diagram", "diagrams"),
                    count(*code_blocks, "code block", "code blocks")
                ));
            }
            for failure in failures {
                lines.push(format!(
                    "{}{} failed: {}",
                    indent(depth),
                    failure.id,
                    failure.error
                ));
            }
            lines
        }
    }
}

/// Format the closing summary of the render stage.
pub fn format_render_summary(deck: &RenderedDeck, cache_stats: Option<&CacheStats>) -> Vec<String> {
    let diagrams: usize = deck.slides.iter().map(|s| s.diagrams).sum();
    let code_blocks: usize = deck.slides.iter().map(|s| s.code_blocks).sum();
    let failed = deck.failure_count();

    let diagram_part = if failed > 0 {
        format!("{} ({} failed)", count(diagrams, "diagram", "diagrams"), failed)
    } else {
        count(diagrams, "diagram", "diagrams")
    };

    let mut lines = vec![format!(
        "Rendered {}: {}, {}",
        count(deck.slides.len(), "slide", "slides"),
        diagram_part,
        count(code_blocks, "code block", "code blocks")
    )];
    match cache_stats {
        Some(stats) => lines.push(format!("Cache: {}", stats)),
        None => lines.push("Cache: disabled".to_string()),
    }
    lines
}

// ============================================================================
// Stage 3: Generate output
// ============================================================================

/// Format generate stage output showing the written pages.
pub fn format_generate_output(pages: &[GeneratedPage]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut slide_pages = 0;
    let mut extras = Vec::new();
    let mut whole_deck = None;

    for page in pages {
        match (page.position, page.file.as_str()) {
            (None, "index.html") => lines.push(format!("Title page \u{2192} {}", page.file)),
            (None, "deck.html") => whole_deck = Some(page),
            (Some(pos), _) => {
                slide_pages += 1;
                lines.push(format!(
                    "{} \u{2192} {}",
                    slide_header(Some(pos), &page.title),
                    page.file
                ));
            }
            (None, _) => extras.push(page),
        }
    }

    if !extras.is_empty() {
        lines.push(String::new());
        lines.push("Extra".to_string());
        for page in &extras {
            lines.push(format!(
                "{} \u{2192} {}",
                slide_header(None, &page.title),
                page.file
            ));
        }
        lines.push(String::new());
    }

    if let Some(page) = whole_deck {
        lines.push(format!("Whole deck \u{2192} {}", page.file));
    }

    lines.push(format!(
        "Generated {}, {}",
        count(slide_pages, "slide page", "slide pages"),
        count(extras.len(), "extra page", "extra pages")
    ));

    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(pages: &[GeneratedPage]) {
    for line in format_generate_output(pages) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
