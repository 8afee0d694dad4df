//! Shared test utilities for the simple-deck test suite.
//!
//! Provides fixture setup and lookup helpers over the scan and render stage
//! types (`DeckManifest`, `SlideEntry`, `RenderedDeck`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let manifest = scan(tmp.path()).unwrap();
//!
//! let slide = find_slide(&manifest, "how-cas9-cuts");
//! assert_eq!(slide.position, Some(3));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::DiagramTheme;
use crate::diagram::{DiagramEngine, DiagramError, DiagramRenderer};
use crate::highlight::CodePrinter;
use crate::render::{RenderedDeck, RenderedSlide};
use crate::scan::DeckManifest;
use crate::slide::Pipeline;
use crate::types::SlideEntry;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Stub diagram engine
// =========================================================================

/// Engine that skips the header line, draws one `<text>` per single-letter
/// node name and fills its node with the theme's `node_fill`. Rejects any
/// definition mentioning `Missing`.
pub struct StubEngine;

impl DiagramEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn compile(&self, definition: &str, theme: &DiagramTheme) -> Result<String, DiagramError> {
        if definition.contains("Missing") {
            return Err(DiagramError::Compile(
                "edge references unknown node Missing".to_string(),
            ));
        }
        let labels: String = definition
            .lines()
            .skip(1)
            .flat_map(|line| line.split(|c: char| !c.is_alphanumeric()))
            .filter(|word| word.len() == 1)
            .map(|word| format!("<text>{word}</text>"))
            .collect();
        Ok(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="root"><defs><marker id="arrow"/></defs><rect fill="{fill}"/><path marker-end="url(#arrow)"/>{labels}</svg>"#,
            fill = theme.node_fill
        ))
    }
}

/// Pipeline over the stub engine with the default theme and line numbers.
pub fn stub_pipeline() -> Pipeline {
    Pipeline::new(
        CodePrinter::new("base16-ocean.dark").unwrap(),
        true,
        DiagramRenderer::new(StubEngine, DiagramTheme::default()),
    )
}

// =========================================================================
// Lookups panic with a clear message on miss
// =========================================================================

/// Find a slide by slug. Panics if not found.
pub fn find_slide<'a>(manifest: &'a DeckManifest, slug: &str) -> &'a SlideEntry {
    manifest
        .slides
        .iter()
        .find(|s| s.slug == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = manifest.slides.iter().map(|s| s.slug.as_str()).collect();
            panic!("slide '{slug}' not found. Available: {slugs:?}")
        })
}

/// Find a rendered slide by slug. Panics if not found.
pub fn find_rendered<'a>(deck: &'a RenderedDeck, slug: &str) -> &'a RenderedSlide {
    deck.slides
        .iter()
        .find(|s| s.entry.slug == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = deck.slides.iter().map(|s| s.entry.slug.as_str()).collect();
            panic!("rendered slide '{slug}' not found. Available: {slugs:?}")
        })
}

/// Titles of the deck slides in order.
pub fn deck_titles(manifest: &DeckManifest) -> Vec<&str> {
    manifest.deck_slides().map(|s| s.title.as_str()).collect()
}
