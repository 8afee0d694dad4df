//! Slide rendering.
//!
//! Stage 2 of the build pipeline. Reads the scan manifest, runs every slide
//! through the content pipeline and writes `rendered.json` for the generate
//! stage.
//!
//! ## Ordering
//!
//! Slides are formatted one after another in manifest order, so diagram
//! identifiers follow reading order (`diagram-0` is the first diagram of the
//! first slide) and rebuilding unchanged content yields identical output.
//! Drawing then runs in parallel on the rayon pool, both across slides and
//! across the diagrams of one slide.
//!
//! ## Output Structure
//!
//! ```text
//! .simple-deck-temp/
//! ├── manifest.json          # From scan
//! ├── rendered.json          # Deck with rendered slide HTML
//! └── diagrams/              # Compiled diagram cache
//!     ├── .cache-manifest.json
//!     └── …
//! ```

use crate::cache::{CacheStats, DiagramCache};
use crate::config::DeckConfig;
use crate::diagram::DiagramRenderer;
use crate::highlight::{CodePrinter, HighlightError};
use crate::scan::DeckManifest;
use crate::slide::{Pipeline, Slide};
use crate::types::{DeckInfo, SlideEntry};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Highlighter error: {0}")]
    Highlight(#[from] HighlightError),
}

/// A diagram that failed to compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramFailure {
    pub id: String,
    pub error: String,
}

/// One slide with its rendered body markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedSlide {
    pub entry: SlideEntry,
    pub html: String,
    pub diagrams: usize,
    pub code_blocks: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DiagramFailure>,
}

/// Output manifest of the render stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDeck {
    pub deck: DeckInfo,
    pub slides: Vec<RenderedSlide>,
    pub config: DeckConfig,
}

impl RenderedDeck {
    pub fn deck_slides(&self) -> impl Iterator<Item = &RenderedSlide> {
        self.slides.iter().filter(|s| s.entry.in_deck())
    }

    pub fn extra_slides(&self) -> impl Iterator<Item = &RenderedSlide> {
        self.slides.iter().filter(|s| !s.entry.in_deck())
    }

    pub fn failure_count(&self) -> usize {
        self.slides.iter().map(|s| s.failures.len()).sum()
    }
}

/// Progress events emitted while slides render.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    SlideRendered {
        position: Option<usize>,
        title: String,
        source: String,
        diagrams: usize,
        code_blocks: usize,
        failures: Vec<DiagramFailure>,
    },
}

pub struct RenderResult {
    pub deck: RenderedDeck,
    /// `None` when rendering ran without the diagram cache.
    pub cache_stats: Option<CacheStats>,
}

/// Build the deck-wide pipeline from config.
pub fn build_pipeline(
    config: &DeckConfig,
    cache: Option<DiagramCache>,
) -> Result<Pipeline, RenderError> {
    let printer = CodePrinter::new(&config.highlight.theme)?;
    let mut diagrams = DiagramRenderer::mermaid(config.diagrams.theme.clone());
    if let Some(cache) = cache {
        diagrams = diagrams.with_cache(cache);
    }
    Ok(Pipeline::new(
        printer,
        config.highlight.line_numbers,
        diagrams,
    ))
}

/// Render the manifest at `manifest_path`.
///
/// With `cache_dir` set, compiled diagrams are looked up in and stored to
/// that directory.
pub fn render(
    manifest_path: &Path,
    cache_dir: Option<&Path>,
    events: Option<Sender<RenderEvent>>,
) -> Result<RenderResult, RenderError> {
    let content = std::fs::read_to_string(manifest_path)?;
    let manifest: DeckManifest = serde_json::from_str(&content)?;

    let cache = cache_dir.map(DiagramCache::open).transpose()?;
    let pipeline = build_pipeline(&manifest.config, cache)?;

    let deck = render_manifest(manifest, &pipeline, events);

    let cache_stats = match pipeline.diagrams().cache() {
        Some(cache) => {
            cache.save()?;
            Some(cache.stats())
        }
        None => None,
    };

    Ok(RenderResult { deck, cache_stats })
}

/// Render every slide of a manifest with the given pipeline.
pub fn render_manifest(
    manifest: DeckManifest,
    pipeline: &Pipeline,
    events: Option<Sender<RenderEvent>>,
) -> RenderedDeck {
    let mut slides: Vec<Slide> = manifest
        .slides
        .iter()
        .map(|entry| {
            let mut slide = Slide::new(entry.body.as_str()).labeled(entry.source.as_str());
            slide.format(pipeline);
            slide
        })
        .collect();

    let rendered: Vec<RenderedSlide> = slides
        .par_iter_mut()
        .zip(manifest.slides.into_par_iter())
        .map_with(events, |events, (slide, entry)| {
            let report = slide.mount(pipeline);
            let counts = slide.counts();
            let failures: Vec<DiagramFailure> = report
                .failed
                .iter()
                .map(|(id, error)| DiagramFailure {
                    id: id.to_string(),
                    error: error.clone(),
                })
                .collect();

            tracing::debug!(
                slide = %entry.source,
                drawn = report.drawn,
                failed = failures.len(),
                "slide rendered"
            );

            if let Some(tx) = events {
                tx.send(RenderEvent::SlideRendered {
                    position: entry.position,
                    title: entry.title.clone(),
                    source: entry.source.clone(),
                    diagrams: counts.diagrams,
                    code_blocks: counts.highlighted + counts.plain,
                    failures: failures.clone(),
                })
                .ok();
            }

            RenderedSlide {
                html: slide.markup(),
                diagrams: counts.diagrams,
                code_blocks: counts.highlighted + counts.plain,
                failures,
                entry,
            }
        })
        .collect();

    RenderedDeck {
        deck: manifest.deck,
        slides: rendered,
        config: manifest.config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan;
    use crate::test_helpers::*;

    fn render_fixtures() -> RenderedDeck {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        render_manifest(manifest, &stub_pipeline(), None)
    }

    #[test]
    fn every_slide_is_rendered_in_order() {
        let deck = render_fixtures();
        let titles: Vec<&str> = deck.deck_slides().map(|s| s.entry.title.as_str()).collect();
        assert_eq!(titles.len(), 5);
        assert_eq!(titles[0], "Editing Life");
        assert_eq!(deck.extra_slides().count(), 1);
    }

    #[test]
    fn diagram_ids_follow_reading_order() {
        let deck = render_fixtures();
        let cas9 = find_rendered(&deck, "how-cas9-cuts");
        let ethics = find_rendered(&deck, "ethics");
        assert!(cas9.html.contains(r#"<svg id="diagram-0""#));
        assert!(ethics.html.contains(r#"<svg id="diagram-1""#));
    }

    #[test]
    fn counts_and_code_blocks() {
        let deck = render_fixtures();
        let guide = find_rendered(&deck, "designing-a-guide");
        assert_eq!(guide.code_blocks, 2);
        assert_eq!(guide.diagrams, 0);
        assert!(guide.html.contains(r#"data-language="python""#));
        assert!(guide.html.contains(r#"data-language="json""#));

        let notes = find_rendered(&deck, "speaker-notes");
        assert!(notes.html.contains("<pre><code>Timing: 5 minutes per section</code></pre>"));
    }

    #[test]
    fn tables_render() {
        let deck = render_fixtures();
        let what = find_rendered(&deck, "what-is-crispr");
        assert!(what.html.contains("<table>"));
        assert!(what.html.contains("<td>CRISPR</td>"));
    }

    #[test]
    fn failures_are_collected_not_fatal() {
        let tmp = setup_fixtures();
        std::fs::write(
            tmp.path().join("060-broken.md"),
            "# Broken\n\n```mermaid\nflowchart LR\n    A --> Missing\n```\n\n- still here\n",
        )
        .unwrap();
        let manifest = scan(tmp.path()).unwrap();
        let deck = render_manifest(manifest, &stub_pipeline(), None);

        assert_eq!(deck.failure_count(), 1);
        let broken = find_rendered(&deck, "broken");
        assert!(broken.html.contains("diagram-failed"));
        assert!(broken.html.contains("<li>still here</li>"));
        assert_eq!(broken.failures[0].id, "diagram-2");
    }

    #[test]
    fn events_sent_per_slide() {
        let tmp = setup_fixtures();
        let manifest = scan(tmp.path()).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        render_manifest(manifest, &stub_pipeline(), Some(tx));
        let events: Vec<RenderEvent> = rx.iter().collect();
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn render_is_deterministic() {
        let a = render_fixtures();
        let b = render_fixtures();
        let html = |d: &RenderedDeck| d.slides.iter().map(|s| s.html.clone()).collect::<Vec<_>>();
        assert_eq!(html(&a), html(&b));
    }

    #[test]
    fn rendered_deck_serializes() {
        let deck = render_fixtures();
        let json = serde_json::to_string(&deck).unwrap();
        let back: RenderedDeck = serde_json::from_str(&json).unwrap();
        assert_eq!(back.slides.len(), deck.slides.len());
        assert_eq!(back.slides[2].html, deck.slides[2].html);
    }

    #[test]
    fn build_pipeline_rejects_unknown_theme() {
        let mut config = DeckConfig::default();
        config.highlight.theme = "nope".to_string();
        assert!(matches!(
            build_pipeline(&config, None),
            Err(RenderError::Highlight(_))
        ));
    }
}
