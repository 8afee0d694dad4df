//! Diagram rendering.
//!
//! A `mermaid` block goes through two phases:
//!
//! 1. **Registration** happens while the slide is formatted. The block gets a
//!    [`DiagramRequest`] with a fresh [`DiagramId`] and renders as a
//!    placeholder showing the raw definition, so the slide is complete before
//!    any diagram is compiled.
//! 2. **Draw** compiles every still-pending definition with the identifier as
//!    namespace key and swaps the placeholder for the SVG.
//!
//! ```text
//! Pending ──▶ Drawing ──▶ Drawn
//!                    └──▶ Failed   (raw definition stays visible)
//! ```
//!
//! The grammar engine sits behind [`DiagramEngine`]. [`MermaidEngine`] is the
//! stock implementation; tests plug in stub engines. Before any engine runs,
//! [`validate_definition`] rejects definitions with no known diagram type,
//! dangling edges or unbalanced brackets and quotes, so those blocks fail
//! visibly instead of drawing something wrong.
//!
//! ## Namespacing
//!
//! Engines emit fixed element ids (`arrow`, `node-A`, …) that would collide
//! when two diagrams share a page. [`scope_svg`] gives the root `<svg>` the
//! diagram's id, prefixes every inner id with it and rewrites `url(#…)` and
//! `href="#…"` references to match. The palette is handed to the engine,
//! which draws with it.

use crate::cache::{self, DiagramCache};
use crate::config::DiagramTheme;
use maud::{Markup, PreEscaped, html};
use rayon::prelude::*;
use regex::Regex;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagramError {
    #[error("diagram definition is empty")]
    Empty,
    #[error("{0}")]
    Compile(String),
    #[error("diagram engine panicked while compiling")]
    Panicked,
    #[error("diagram engine output has no <svg> root element")]
    NoSvgRoot,
}

// ============================================================================
// Identifiers
// ============================================================================

/// Session-unique diagram identifier, rendered as `diagram-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagramId(u64);

impl DiagramId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diagram-{}", self.0)
    }
}

/// Monotonic identifier allocator.
///
/// Clones share one counter, so every slide rendered with clones of the same
/// allocator draws from a single sequence and no identifier repeats.
#[derive(Debug, Clone, Default)]
pub struct DiagramIds(Arc<AtomicU64>);

impl DiagramIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> DiagramId {
        DiagramId(self.0.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of identifiers handed out so far.
    pub fn allocated(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramState {
    Pending,
    Drawing,
    /// Scoped SVG ready to splice.
    Drawn(String),
    /// Compile error message.
    Failed(String),
}

/// One registered diagram block and its lifecycle state.
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    pub id: DiagramId,
    pub definition: String,
    pub state: DiagramState,
}

impl DiagramRequest {
    pub fn new(id: DiagramId, definition: impl Into<String>) -> Self {
        Self {
            id,
            definition: definition.into(),
            state: DiagramState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == DiagramState::Pending
    }

    /// Current markup for this diagram's location in the slide.
    pub fn markup(&self) -> Markup {
        let id = self.id.to_string();
        match &self.state {
            DiagramState::Drawn(svg) => html! {
                div.diagram.diagram-rendered data-diagram-id=(id) {
                    (PreEscaped(svg))
                }
            },
            DiagramState::Failed(error) => html! {
                pre.diagram.diagram-failed data-diagram-id=(id) title=(error) {
                    code { (self.definition) }
                }
            },
            DiagramState::Pending | DiagramState::Drawing => html! {
                pre.diagram.diagram-pending data-diagram-id=(id) {
                    code { (self.definition) }
                }
            },
        }
    }
}

// ============================================================================
// Engines
// ============================================================================

/// A diagram grammar engine: definition text in, SVG out.
pub trait DiagramEngine: Send + Sync {
    /// Stable engine identity, part of the compile cache key.
    fn name(&self) -> &str;

    /// Compile `definition` with the deck's palette applied.
    fn compile(&self, definition: &str, theme: &DiagramTheme) -> Result<String, DiagramError>;
}

/// Mermaid engine backed by `mermaid-rs-renderer`.
pub struct MermaidEngine;

impl DiagramEngine for MermaidEngine {
    fn name(&self) -> &str {
        "mermaid-rs-renderer"
    }

    fn compile(&self, definition: &str, theme: &DiagramTheme) -> Result<String, DiagramError> {
        let opts = mermaid_rs_renderer::RenderOptions {
            theme: mermaid_theme(theme),
            layout: mermaid_rs_renderer::LayoutConfig::default(),
        };
        mermaid_rs_renderer::render_with_options(definition, opts)
            .map_err(|err| DiagramError::Compile(err.to_string()))
    }
}

/// Map the deck palette onto the engine's theme, keeping its stock fonts
/// and chart colors.
fn mermaid_theme(theme: &DiagramTheme) -> mermaid_rs_renderer::Theme {
    mermaid_rs_renderer::Theme {
        background: theme.background.clone(),
        primary_color: theme.node_fill.clone(),
        primary_border_color: theme.node_border.clone(),
        primary_text_color: theme.text.clone(),
        text_color: theme.text.clone(),
        line_color: theme.edge.clone(),
        edge_label_background: theme.label_background.clone(),
        cluster_background: theme.background.clone(),
        cluster_border: theme.node_border.clone(),
        sequence_actor_fill: theme.node_fill.clone(),
        sequence_actor_border: theme.node_border.clone(),
        sequence_actor_line: theme.edge.clone(),
        ..mermaid_rs_renderer::Theme::modern()
    }
}

// ============================================================================
// Definition checks
// ============================================================================

/// Diagram types a definition may open with.
const DIAGRAM_TYPES: &[&str] = &[
    "flowchart",
    "flowchart-elk",
    "graph",
    "sequenceDiagram",
    "classDiagram",
    "classDiagram-v2",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "journey",
    "gitGraph",
    "mindmap",
    "timeline",
    "quadrantChart",
    "requirementDiagram",
    "xychart-beta",
    "sankey-beta",
    "block-beta",
    "packet-beta",
    "architecture-beta",
    "kanban",
    "C4Context",
    "C4Container",
    "C4Component",
    "C4Dynamic",
    "C4Deployment",
];

/// A flowchart statement that ends on an edge operator, optionally followed
/// by a `|label|`.
static DANGLING_EDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:--+>|==+>|-\.+->|--+[ox]?|==+|-\.+-)\s*(?:\|[^|]*\|)?\s*;?$")
        .expect("valid regex")
});

/// Structural checks run before a definition reaches the engine.
///
/// The first statement must name a known diagram type. Flowcharts may not
/// end a statement on an edge operator. Flowchart, class and state diagrams
/// must balance `[`, `{` and `"`.
pub fn validate_definition(definition: &str) -> Result<(), DiagramError> {
    let statements = statement_lines(definition);
    let Some(&(_, header)) = statements.first() else {
        return Err(DiagramError::Empty);
    };
    let kind = header
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or_default();
    if !DIAGRAM_TYPES.contains(&kind) {
        return Err(DiagramError::Compile(format!(
            "unknown diagram type '{kind}'"
        )));
    }

    let flowchart = matches!(kind, "flowchart" | "flowchart-elk" | "graph");
    let nested = flowchart || kind.starts_with("classDiagram") || kind.starts_with("stateDiagram");

    let mut open: Vec<(char, usize)> = Vec::new();
    for &(line_number, line) in &statements[1..] {
        if flowchart && DANGLING_EDGE.is_match(line) {
            return Err(line_error(line_number, "edge has no target node"));
        }
        if nested {
            check_delimiters(line, line_number, flowchart, &mut open)?;
        }
    }
    match open.last() {
        Some(&(c, line_number)) => Err(line_error(line_number, &format!("unclosed '{c}'"))),
        None => Ok(()),
    }
}

/// Trimmed, 1-based numbered statement lines: blanks, `%%` comments and
/// leading `---` front matter are skipped.
fn statement_lines(definition: &str) -> Vec<(usize, &str)> {
    let mut statements = Vec::new();
    let mut in_front_matter = false;
    for (index, line) in definition.lines().enumerate() {
        let line = line.trim();
        if statements.is_empty() && line == "---" {
            in_front_matter = !in_front_matter;
            continue;
        }
        if in_front_matter || line.is_empty() || line.starts_with("%%") {
            continue;
        }
        statements.push((index + 1, line));
    }
    statements
}

fn check_delimiters(
    line: &str,
    line_number: usize,
    flowchart: bool,
    open: &mut Vec<(char, usize)>,
) -> Result<(), DiagramError> {
    let mut quoted = false;
    let mut prev = ' ';
    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            _ if quoted => {}
            '[' | '{' => open.push((c, line_number)),
            // Asymmetric node shape: `id>label]`
            '>' if flowchart && open.is_empty() && (prev.is_alphanumeric() || prev == '_') => {
                open.push(('[', line_number))
            }
            ']' | '}' => {
                let expected = if c == ']' { '[' } else { '{' };
                match open.pop() {
                    Some((opener, _)) if opener == expected => {}
                    _ => return Err(line_error(line_number, &format!("unexpected '{c}'"))),
                }
            }
            _ => {}
        }
        prev = c;
    }
    if quoted {
        return Err(line_error(line_number, "unclosed '\"'"));
    }
    Ok(())
}

fn line_error(line_number: usize, message: &str) -> DiagramError {
    DiagramError::Compile(format!("line {line_number}: {message}"))
}

// ============================================================================
// Renderer
// ============================================================================

/// Work item for one pending diagram.
#[derive(Debug, Clone)]
pub struct DrawJob {
    pub id: DiagramId,
    pub definition: String,
}

#[derive(Debug)]
pub struct DrawOutcome {
    pub id: DiagramId,
    pub result: Result<String, DiagramError>,
}

/// Compiles diagram definitions with a fixed engine, theme and optional cache.
///
/// Holds no per-slide state; one renderer serves every slide of a deck.
pub struct DiagramRenderer {
    engine: Box<dyn DiagramEngine>,
    theme: DiagramTheme,
    /// Cache identity of the engine under this theme.
    engine_hash: String,
    cache: Option<DiagramCache>,
}

impl DiagramRenderer {
    pub fn new(engine: impl DiagramEngine + 'static, theme: DiagramTheme) -> Self {
        let palette = serde_json::to_string(&theme).unwrap_or_default();
        let engine_hash = cache::hash_engine(&format!("{}\0{palette}", engine.name()));
        Self {
            engine: Box::new(engine),
            theme,
            engine_hash,
            cache: None,
        }
    }

    pub fn mermaid(theme: DiagramTheme) -> Self {
        Self::new(MermaidEngine, theme)
    }

    pub fn with_cache(mut self, cache: DiagramCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&DiagramCache> {
        self.cache.as_ref()
    }

    pub fn theme(&self) -> &DiagramTheme {
        &self.theme
    }

    /// Compile one definition into SVG namespaced under `key`.
    pub fn compile(&self, definition: &str, key: DiagramId) -> Result<String, DiagramError> {
        if definition.trim().is_empty() {
            return Err(DiagramError::Empty);
        }
        validate_definition(definition)?;
        let raw = self.compile_raw(definition)?;
        scope_svg(&raw, &key.to_string())
    }

    fn compile_raw(&self, definition: &str) -> Result<String, DiagramError> {
        let Some(cache) = &self.cache else {
            return self.compile_with_engine(definition);
        };
        let definition_hash = cache::hash_definition(definition);
        if let Some(svg) = cache.lookup(&definition_hash, &self.engine_hash) {
            tracing::debug!(definition_hash = %&definition_hash[..12], "diagram cache hit");
            return Ok(svg);
        }
        let svg = self.compile_with_engine(definition)?;
        if let Err(err) = cache.store(&definition_hash, &self.engine_hash, &svg) {
            tracing::warn!(error = %err, "could not write diagram cache entry");
        }
        Ok(svg)
    }

    /// A panicking engine fails only the diagram it was compiling.
    fn compile_with_engine(&self, definition: &str) -> Result<String, DiagramError> {
        catch_unwind(AssertUnwindSafe(|| {
            self.engine.compile(definition, &self.theme)
        }))
        .unwrap_or(Err(DiagramError::Panicked))
    }

    /// Compile every job independently on the rayon pool.
    ///
    /// Outcomes come back in job order, but compiles run concurrently and
    /// finish in no particular order.
    pub fn run(&self, jobs: &[DrawJob]) -> Vec<DrawOutcome> {
        jobs.par_iter()
            .map(|job| DrawOutcome {
                id: job.id,
                result: self.compile(&job.definition, job.id),
            })
            .collect()
    }
}

// ============================================================================
// SVG scoping
// ============================================================================

static SVG_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("valid regex"));
static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s)id="([^"]*)""#).expect("valid regex"));
static URL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url\(#([^)\s]+)\)").expect("valid regex"));
static HREF_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"href="#([^"]+)""##).expect("valid regex"));

/// Namespace an engine's SVG under `key`.
pub fn scope_svg(svg: &str, key: &str) -> Result<String, DiagramError> {
    let open = SVG_OPEN_TAG.find(svg).ok_or(DiagramError::NoSvgRoot)?;
    let prefix = &svg[..open.start()];

    let root_attrs = ID_ATTR.replace_all(open.as_str(), "");
    let root = root_attrs.replacen("<svg", &format!(r#"<svg id="{key}""#), 1);

    let body = &svg[open.end()..];
    let body = ID_ATTR.replace_all(body, |caps: &regex::Captures| {
        format!(r#"{}id="{key}-{}""#, &caps[1], &caps[2])
    });
    let body = URL_REF.replace_all(&body, |caps: &regex::Captures| {
        format!("url(#{key}-{})", &caps[1])
    });
    let body = HREF_REF.replace_all(&body, |caps: &regex::Captures| {
        format!(r##"href="#{key}-{}""##, &caps[1])
    });

    Ok(format!("{prefix}{root}{body}"))
}
