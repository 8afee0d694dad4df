//! HTML deck generation.
//!
//! Stage 3 of the build pipeline. Takes the rendered deck and writes the final
//! static HTML pages.
//!
//! ## Generated Pages
//!
//! - **Title page** (`/index.html`): deck title, description and slide list
//! - **Slide pages** (`/{n}.html`): one slide per page, with previous/next
//!   links and keyboard navigation
//! - **Extra pages** (`/{slug}.html`): unnumbered slides, outside the sequence
//! - **Whole deck** (`/deck.html`): every deck slide on one page, for printing
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── deck.html
//! ├── 1.html
//! ├── 2.html
//! ├── …
//! └── speaker-notes.html
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: Base styles (colors injected from config)
//! - `static/nav.js`: Arrow-key and swipe navigation between slide pages
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Slide bodies arrive as finished markup from the render stage and are
//! inserted unescaped; everything else goes through maud's escaping.

use crate::config;
use crate::render::{RenderedDeck, RenderedSlide};
use crate::types::DeckInfo;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/nav.js");

/// A page written by [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPage {
    pub title: String,
    /// Deck position, for slide pages.
    pub position: Option<usize>,
    /// File name relative to the output directory.
    pub file: String,
}

/// Generate the site from the rendered deck at `rendered_path`.
pub fn generate(
    rendered_path: &Path,
    output_dir: &Path,
) -> Result<Vec<GeneratedPage>, GenerateError> {
    let content = fs::read_to_string(rendered_path)?;
    let deck: RenderedDeck = serde_json::from_str(&content)?;
    generate_deck(&deck, output_dir)
}

/// Write every page of `deck` into `output_dir`.
pub fn generate_deck(
    deck: &RenderedDeck,
    output_dir: &Path,
) -> Result<Vec<GeneratedPage>, GenerateError> {
    let color_css = config::generate_color_css(&deck.config.colors);
    let css = format!("{}\n\n{}", color_css, CSS_STATIC);

    fs::create_dir_all(output_dir)?;
    let mut pages = Vec::new();

    let mut write_page = |title: &str, position: Option<usize>, file: String, markup: Markup| {
        fs::write(output_dir.join(&file), markup.into_string())?;
        tracing::debug!(file = %file, "page written");
        pages.push(GeneratedPage {
            title: title.to_string(),
            position,
            file,
        });
        Ok::<(), std::io::Error>(())
    };

    write_page(
        &deck.deck.title,
        None,
        "index.html".to_string(),
        render_index(deck, &css),
    )?;

    let slides: Vec<&RenderedSlide> = deck.deck_slides().collect();
    for (idx, slide) in slides.iter().enumerate() {
        let prev = idx.checked_sub(1).map(|i| slides[i]);
        let next = slides.get(idx + 1).copied();
        write_page(
            &slide.entry.title,
            slide.entry.position,
            slide.entry.page_name(),
            render_slide_page(&deck.deck, slide, prev, next, &css),
        )?;
    }

    for slide in deck.extra_slides() {
        write_page(
            &slide.entry.title,
            None,
            slide.entry.page_name(),
            render_extra_page(&deck.deck, slide, &css),
        )?;
    }

    write_page(
        &deck.deck.title,
        None,
        "deck.html".to_string(),
        render_whole_deck(deck, &css),
    )?;

    Ok(pages)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(
    info: &DeckInfo,
    title: &str,
    css: &str,
    body_class: Option<&str>,
    content: Markup,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(info.lang) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                @if !info.description.is_empty() {
                    meta name="description" content=(info.description);
                }
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Deck title bar shown above every slide page.
fn deck_header(info: &DeckInfo, counter: Option<Markup>) -> Markup {
    html! {
        header.deck-header {
            a.deck-title href="index.html" { (info.title) }
            @if let Some(counter) = counter {
                span.slide-counter { (counter) }
            }
        }
    }
}

/// One slide: its title and rendered body.
fn slide_article(slide: &RenderedSlide, id: Option<String>) -> Markup {
    html! {
        article.slide id=[id] {
            h1.slide-title { (slide.entry.title) }
            div.slide-body {
                (PreEscaped(&slide.html))
            }
        }
    }
}

/// Renders the title page
fn render_index(deck: &RenderedDeck, css: &str) -> Markup {
    let info = &deck.deck;
    let extras: Vec<&RenderedSlide> = deck.extra_slides().collect();

    let content = html! {
        main.title-page {
            h1.deck-title { (info.title) }
            @if !info.description.is_empty() {
                p.deck-description { (info.description) }
            }
            nav.deck-actions {
                a.start href="1.html" { "Start" }
                a href="deck.html" { "All slides" }
            }
            ol.slide-list {
                @for slide in deck.deck_slides() {
                    li {
                        a href=(slide.entry.page_name()) { (slide.entry.title) }
                    }
                }
            }
            @if !extras.is_empty() {
                h2 { "More" }
                ul.extra-list {
                    @for slide in &extras {
                        li {
                            a href=(slide.entry.page_name()) { (slide.entry.title) }
                        }
                    }
                }
            }
        }
    };

    base_document(info, &info.title, css, Some("title-view"), content)
}

/// Renders a single deck slide page
fn render_slide_page(
    info: &DeckInfo,
    slide: &RenderedSlide,
    prev: Option<&RenderedSlide>,
    next: Option<&RenderedSlide>,
    css: &str,
) -> Markup {
    let position = slide.entry.position.unwrap_or_default();
    // The ends of the deck lead back to the title page
    let prev_url = prev
        .map(|s| s.entry.page_name())
        .unwrap_or_else(|| "index.html".to_string());
    let next_url = next
        .map(|s| s.entry.page_name())
        .unwrap_or_else(|| "index.html".to_string());

    let counter = html! { (position) " / " (info.slide_count) };
    let page_title = format!("{} · {}", slide.entry.title, info.title);

    let content = html! {
        (deck_header(info, Some(counter)))
        main {
            (slide_article(slide, None))
        }
        footer.slide-nav {
            a.prev rel="prev" href=(prev_url) { "← Previous" }
            a.next rel="next" href=(next_url) { "Next →" }
        }
        div.nav-zones data-prev=(prev_url) data-next=(next_url) {}
        script { (PreEscaped(JS)) }
    };

    base_document(info, &page_title, css, Some("slide-view"), content)
}

/// Renders an unnumbered slide on its own page
fn render_extra_page(info: &DeckInfo, slide: &RenderedSlide, css: &str) -> Markup {
    let page_title = format!("{} · {}", slide.entry.title, info.title);
    let content = html! {
        (deck_header(info, None))
        main {
            (slide_article(slide, None))
        }
    };
    base_document(info, &page_title, css, Some("slide-view"), content)
}

/// Renders every deck slide on one page
fn render_whole_deck(deck: &RenderedDeck, css: &str) -> Markup {
    let info = &deck.deck;
    let content = html! {
        (deck_header(info, None))
        main.whole-deck {
            @for slide in deck.deck_slides() {
                (slide_article(slide, slide.entry.position.map(|n| format!("slide-{n}"))))
            }
        }
    };
    base_document(info, &info.title, css, Some("deck-view"), content)
}
