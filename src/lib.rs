//! # Simple Deck
//!
//! A minimal static generator for markdown slide decks. Each slide is one
//! markdown file; prose becomes HTML, fenced code is syntax highlighted, and
//! `mermaid` blocks are compiled to inline SVG diagrams.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Scan      content/  →  manifest.json    (slide files → deck manifest)
//! 2. Render    manifest  →  rendered.json    (markdown, code, diagrams → HTML)
//! 3. Generate  rendered  →  dist/            (final HTML pages)
//! ```
//!
//! Each manifest is human-readable JSON you can inspect, and each stage can
//! be run on its own from the CLI.
//!
//! # The Content Pipeline
//!
//! Stage 2 runs every slide through the same pipeline:
//!
//! ```text
//! Slide ─▶ markdown::format ─▶ classify (per code node) ─┬─▶ diagram   (placeholder, drawn later)
//!                                                       ├─▶ highlight (styled, numbered)
//!                                                       └─▶ plain     (escaped)
//! ```
//!
//! Classification looks at the fence tag only. Diagrams are registered while
//! the slide is formatted and drawn in a second pass; a diagram that fails to
//! compile keeps showing its definition and never takes the rest of the slide
//! down with it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Routes a code node to one of three render paths by its tag |
//! | [`markdown`] | pulldown-cmark formatting with a hook for code nodes |
//! | [`highlight`] | syntect pretty-printer with line numbers |
//! | [`diagram`] | Diagram requests, identifiers, engines and SVG namespacing |
//! | [`slide`] | Slide container: mount, draw, content changes |
//! | [`cache`] | Content-addressed cache of compiled diagrams |
//! | [`scan`] | Stage 1: reads the content directory into a deck manifest |
//! | [`render`] | Stage 2: renders every slide, in parallel |
//! | [`generate`] | Stage 3: writes the HTML pages using Maud |
//! | [`config`] | `config.toml` loading, validation, merging and CSS generation |
//! | [`types`] | Shared types serialized between stages |
//! | [`naming`] | `NNN-name` file-name convention |
//! | [`output`] | CLI output formatting for every stage |

pub mod cache;
pub mod classify;
pub mod config;
pub mod diagram;
pub mod generate;
pub mod highlight;
pub mod markdown;
pub mod naming;
pub mod output;
pub mod render;
pub mod scan;
pub mod slide;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
