//! Slide container.
//!
//! A [`Slide`] owns one slide document, the diagram requests registered while
//! formatting it, and its mount state. The [`Pipeline`] it is mounted with
//! carries everything shared by the whole deck: the code printer, the diagram
//! renderer and the session's identifier allocator.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──mount──▶ format (ids allocated) ──▶ draw ──▶ mounted
//!                                              ▲        │
//!                        set_document (changed)┘        │ unmount
//!                                                       ▼
//!                                  in-flight requests back to Pending
//! ```
//!
//! Drawing is split into [`Slide::begin_draw`] and [`Slide::complete_draw`]
//! so compiles can run elsewhere. Each batch carries the generation it was
//! started under; unmounting or replacing the document bumps the generation,
//! and a completion from an older generation is dropped instead of being
//! written into requests that no longer exist.

use crate::classify::RenderPath;
use crate::diagram::{
    DiagramId, DiagramIds, DiagramRenderer, DiagramRequest, DiagramState, DrawJob, DrawOutcome,
};
use crate::highlight::{self, CodePrinter};
use crate::markdown::{self, BlockHook, BlockOutput, Formatted};

/// Deck-wide renderers shared by every slide of a session.
pub struct Pipeline {
    printer: CodePrinter,
    line_numbers: bool,
    diagrams: DiagramRenderer,
    ids: DiagramIds,
}

impl Pipeline {
    pub fn new(printer: CodePrinter, line_numbers: bool, diagrams: DiagramRenderer) -> Self {
        Self {
            printer,
            line_numbers,
            diagrams,
            ids: DiagramIds::new(),
        }
    }

    pub fn printer(&self) -> &CodePrinter {
        &self.printer
    }

    pub fn diagrams(&self) -> &DiagramRenderer {
        &self.diagrams
    }

    pub fn ids(&self) -> &DiagramIds {
        &self.ids
    }
}

/// Result of one draw pass over a slide.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrawReport {
    /// Diagrams drawn by this pass.
    pub drawn: usize,
    /// Diagrams that failed to compile, with the error.
    pub failed: Vec<(DiagramId, String)>,
    /// Requests already drawn or failed before this pass.
    pub skipped: usize,
    /// Completions discarded because the slide changed underneath them.
    pub stale: usize,
}

/// Compile jobs handed out by [`Slide::begin_draw`].
#[derive(Debug)]
pub struct DrawBatch {
    generation: u64,
    skipped: usize,
    pub jobs: Vec<DrawJob>,
}

/// Block counts from the last formatting pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockCounts {
    pub highlighted: usize,
    pub plain: usize,
    pub diagrams: usize,
}

pub struct Slide {
    label: String,
    document: String,
    formatted: Option<Formatted>,
    requests: Vec<DiagramRequest>,
    counts: BlockCounts,
    mounted: bool,
    generation: u64,
}

impl Slide {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            label: String::new(),
            document: document.into(),
            formatted: None,
            requests: Vec::new(),
            counts: BlockCounts::default(),
            mounted: false,
            generation: 0,
        }
    }

    /// Name used in log messages.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn requests(&self) -> &[DiagramRequest] {
        &self.requests
    }

    pub fn counts(&self) -> BlockCounts {
        self.counts
    }

    /// Registration pass: format the document and register its diagrams.
    ///
    /// No-op when the current document is already formatted.
    pub fn format(&mut self, pipeline: &Pipeline) {
        if self.formatted.is_some() {
            return;
        }
        let mut hook = SlideHook {
            pipeline,
            requests: Vec::new(),
            counts: BlockCounts::default(),
        };
        let formatted = markdown::format(&self.document, &mut hook);
        self.requests = hook.requests;
        self.counts = hook.counts;
        self.formatted = Some(formatted);
    }

    /// Mount and draw every pending diagram.
    pub fn mount(&mut self, pipeline: &Pipeline) -> DrawReport {
        self.format(pipeline);
        self.mounted = true;
        self.draw(pipeline)
    }

    /// Detach the slide. Compiles already running complete into nothing.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.generation += 1;
        for request in &mut self.requests {
            if request.state == DiagramState::Drawing {
                request.state = DiagramState::Pending;
            }
        }
    }

    /// Replace the document. Identical content changes nothing.
    ///
    /// Otherwise the previous requests and their output are discarded, and a
    /// mounted slide is re-formatted under fresh identifiers and drawn.
    pub fn set_document(&mut self, document: impl Into<String>, pipeline: &Pipeline) -> DrawReport {
        let document = document.into();
        if document == self.document {
            return DrawReport::default();
        }
        self.document = document;
        self.formatted = None;
        self.requests.clear();
        self.counts = BlockCounts::default();
        self.generation += 1;
        if !self.mounted {
            return DrawReport::default();
        }
        self.format(pipeline);
        self.draw(pipeline)
    }

    /// Move every pending request to `Drawing` and hand out its compile job.
    ///
    /// Returns `None` unless the slide is mounted.
    pub fn begin_draw(&mut self) -> Option<DrawBatch> {
        if !self.mounted || self.formatted.is_none() {
            return None;
        }
        let mut jobs = Vec::new();
        let mut skipped = 0;
        for request in &mut self.requests {
            match request.state {
                DiagramState::Pending => {
                    request.state = DiagramState::Drawing;
                    jobs.push(DrawJob {
                        id: request.id,
                        definition: request.definition.clone(),
                    });
                }
                DiagramState::Drawn(_) | DiagramState::Failed(_) => skipped += 1,
                DiagramState::Drawing => {}
            }
        }
        Some(DrawBatch {
            generation: self.generation,
            skipped,
            jobs,
        })
    }

    /// Splice compile outcomes into their requests.
    pub fn complete_draw(&mut self, batch: DrawBatch, outcomes: Vec<DrawOutcome>) -> DrawReport {
        let mut report = DrawReport {
            skipped: batch.skipped,
            ..DrawReport::default()
        };
        if batch.generation != self.generation {
            report.stale = outcomes.len();
            tracing::debug!(
                slide = %self.label,
                stale = report.stale,
                "discarding diagram results for a detached slide"
            );
            return report;
        }
        for outcome in outcomes {
            let Some(request) = self
                .requests
                .iter_mut()
                .find(|r| r.id == outcome.id && r.state == DiagramState::Drawing)
            else {
                report.stale += 1;
                continue;
            };
            match outcome.result {
                Ok(svg) => {
                    request.state = DiagramState::Drawn(svg);
                    report.drawn += 1;
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(
                        slide = %self.label,
                        diagram = %outcome.id,
                        error = %message,
                        "diagram failed to compile, showing its definition"
                    );
                    request.state = DiagramState::Failed(message.clone());
                    report.failed.push((outcome.id, message));
                }
            }
        }
        report
    }

    /// One full draw pass: begin, compile on the rayon pool, complete.
    pub fn draw(&mut self, pipeline: &Pipeline) -> DrawReport {
        let Some(batch) = self.begin_draw() else {
            return DrawReport::default();
        };
        let outcomes = pipeline.diagrams.run(&batch.jobs);
        self.complete_draw(batch, outcomes)
    }

    /// Current markup: formatted prose with each diagram in its present state.
    ///
    /// Empty until the slide has been formatted.
    pub fn markup(&self) -> String {
        let Some(formatted) = &self.formatted else {
            return String::new();
        };
        formatted.assemble(|slot| {
            self.requests
                .get(slot)
                .map(|request| request.markup().into_string())
                .unwrap_or_default()
        })
    }
}

/// Routes classified code nodes of one slide to the deck's renderers.
struct SlideHook<'a> {
    pipeline: &'a Pipeline,
    requests: Vec<DiagramRequest>,
    counts: BlockCounts,
}

impl BlockHook for SlideHook<'_> {
    fn render_block(&mut self, path: RenderPath, code: &str) -> BlockOutput {
        match path {
            RenderPath::Diagram => {
                let definition = code.strip_suffix('\n').unwrap_or(code);
                let id = self.pipeline.ids.next_id();
                self.requests.push(DiagramRequest::new(id, definition));
                self.counts.diagrams += 1;
                BlockOutput::Slot(self.requests.len() - 1)
            }
            RenderPath::HighlightedCode(language) => {
                self.counts.highlighted += 1;
                BlockOutput::Markup(self.pipeline.printer.render(
                    code,
                    Some(&language),
                    self.pipeline.line_numbers,
                ))
            }
            RenderPath::PlainCode => {
                self.counts.plain += 1;
                let text = code.strip_suffix('\n').unwrap_or(code);
                BlockOutput::Markup(highlight::plain_block(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeckConfig;
    use crate::diagram::DiagramError;
    use crate::render::build_pipeline;
    use crate::test_helpers::stub_pipeline as pipeline;

    const SCENARIO: &str = "\
# Editing genes

- Find the target
- Cut the DNA

```python
def guide(seq):
    return seq[:20]
```

```mermaid
flowchart LR
    A --> B
```
";

    #[test]
    fn scenario_list_code_and_diagram() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        let report = slide.mount(&pipeline);
        assert_eq!(report.drawn, 1);
        assert!(report.failed.is_empty());

        let html = slide.markup();
        assert!(html.contains("<li>Find the target</li>"));
        assert!(html.contains(r#"data-language="python""#));
        assert!(html.contains(r#"<span class="line-number">2</span>"#));
        assert!(html.contains("diagram-rendered"));
        assert!(html.contains(r#"<svg id="diagram-0""#));
        assert!(html.contains("<text>A</text><text>B</text>"));
        assert!(!html.contains("diagram-pending"));
        assert_eq!(
            slide.counts(),
            BlockCounts {
                highlighted: 1,
                plain: 0,
                diagrams: 1
            }
        );
    }

    #[test]
    fn placeholder_visible_before_draw() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        assert_eq!(slide.markup(), "");
        slide.format(&pipeline);
        let html = slide.markup();
        assert!(html.contains("diagram-pending"));
        assert!(html.contains("A --&gt; B"));
        assert!(html.contains("<li>Cut the DNA</li>"));
    }

    #[test]
    fn drawing_twice_is_idempotent() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        slide.mount(&pipeline);
        let first = slide.markup();
        let allocated = pipeline.ids().allocated();

        let report = slide.draw(&pipeline);
        assert_eq!(report.drawn, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(slide.markup(), first);
        assert_eq!(pipeline.ids().allocated(), allocated);
    }

    #[test]
    fn remount_with_identical_content_allocates_nothing() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        slide.mount(&pipeline);
        let first = slide.markup();

        slide.unmount();
        let report = slide.set_document(SCENARIO, &pipeline);
        assert_eq!(report, DrawReport::default());
        slide.mount(&pipeline);

        assert_eq!(slide.markup(), first);
        assert_eq!(pipeline.ids().allocated(), 1);
    }

    #[test]
    fn content_change_redraws_under_fresh_ids() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        slide.mount(&pipeline);

        let report = slide.set_document("```mermaid\ngraph TD\nC --> D\n```\n", &pipeline);
        assert_eq!(report.drawn, 1);
        let html = slide.markup();
        assert!(html.contains(r#"<svg id="diagram-1""#));
        assert!(!html.contains("diagram-0"));
        assert!(!html.contains("Find the target"));
    }

    #[test]
    fn change_while_unmounted_waits_for_mount() {
        let pipeline = pipeline();
        let mut slide = Slide::new("```mermaid\ngraph TD\nA --> B\n```\n");
        let report = slide.set_document("```mermaid\ngraph TD\nC --> D\n```\n", &pipeline);
        assert_eq!(report, DrawReport::default());
        assert_eq!(pipeline.ids().allocated(), 0);
        slide.mount(&pipeline);
        assert_eq!(slide.requests()[0].definition, "graph TD\nC --> D");
    }

    #[test]
    fn ids_unique_across_slides_and_mounts() {
        let pipeline = pipeline();
        let doc = "```mermaid\ngraph TD\nA --> B\n```\n\n```mermaid\ngraph TD\nB --> C\n```\n";
        let mut a = Slide::new(doc);
        let mut b = Slide::new(doc);
        a.mount(&pipeline);
        b.mount(&pipeline);
        a.unmount();
        a.mount(&pipeline);
        b.set_document("```mermaid\ngraph TD\nX --> Y\n```\n", &pipeline);

        let mut ids: Vec<DiagramId> = a
            .requests()
            .iter()
            .chain(b.requests())
            .map(|r| r.id)
            .collect();
        ids.sort();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before);
        assert_eq!(pipeline.ids().allocated(), 5);
    }

    #[test]
    fn malformed_diagram_is_isolated() {
        let pipeline = pipeline();
        let doc = "\
```mermaid
flowchart LR
    A --> Missing
```

```mermaid
flowchart LR
    A --> B
```

```python
x = 1
```
";
        let mut slide = Slide::new(doc).labeled("010-test");
        let report = slide.mount(&pipeline);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("Missing"));

        let html = slide.markup();
        assert!(html.contains("diagram-failed"));
        assert!(html.contains("A --&gt; Missing"));
        assert!(html.contains("diagram-rendered"));
        assert!(html.contains(r#"data-language="python""#));

        // Failed diagrams are not retried
        let again = slide.draw(&pipeline);
        assert_eq!(again.skipped, 2);
        assert!(again.failed.is_empty());
    }

    #[test]
    fn unmount_mid_draw_discards_completion() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        slide.format(&pipeline);
        slide.mounted = true;

        let batch = slide.begin_draw().unwrap();
        assert_eq!(batch.jobs.len(), 1);
        assert_eq!(slide.requests()[0].state, DiagramState::Drawing);
        let outcomes = pipeline.diagrams().run(&batch.jobs);

        slide.unmount();
        assert_eq!(slide.requests()[0].state, DiagramState::Pending);

        let report = slide.complete_draw(batch, outcomes);
        assert_eq!(report.stale, 1);
        assert_eq!(report.drawn, 0);
        assert!(slide.markup().contains("diagram-pending"));

        // The next mount draws it for real, under the same id
        let report = slide.mount(&pipeline);
        assert_eq!(report.drawn, 1);
        assert_eq!(pipeline.ids().allocated(), 1);
    }

    #[test]
    fn content_change_mid_draw_discards_completion() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        slide.format(&pipeline);
        slide.mounted = true;
        let batch = slide.begin_draw().unwrap();
        let outcomes = pipeline.diagrams().run(&batch.jobs);

        slide.set_document("```mermaid\ngraph TD\nC --> D\n```\n", &pipeline);
        let report = slide.complete_draw(batch, outcomes);
        assert_eq!(report.stale, 1);
        assert!(slide.markup().contains(r#"<svg id="diagram-1""#));
    }

    #[test]
    fn begin_draw_requires_mount() {
        let pipeline = pipeline();
        let mut slide = Slide::new(SCENARIO);
        slide.format(&pipeline);
        assert!(slide.begin_draw().is_none());
        assert_eq!(slide.draw(&pipeline), DrawReport::default());
    }

    #[test]
    fn unknown_language_and_untagged_blocks() {
        let pipeline = pipeline();
        let mut slide = Slide::new("```crispr-dsl\ncut(PAM)\n```\n\n```\nraw <text>\n```\n");
        slide.mount(&pipeline);
        let html = slide.markup();
        assert!(html.contains(r#"data-language="crispr-dsl""#));
        assert!(html.contains("cut(PAM)"));
        assert!(html.contains("<pre><code>raw &lt;text&gt;</code></pre>"));
        assert_eq!(slide.counts().plain, 1);
    }

    #[test]
    fn empty_diagram_fails_without_engine() {
        let pipeline = pipeline();
        let mut slide = Slide::new("```mermaid\n```\n");
        let report = slide.mount(&pipeline);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].1, DiagramError::Empty.to_string());
    }

    #[test]
    fn stock_engine_failures_keep_definition_visible() {
        let pipeline = build_pipeline(&DeckConfig::default(), None).unwrap();
        let doc = "\
```mermaid
flowchart TD
    A -->
```

```mermaid
this is not mermaid at all
```

- still listed
";
        let mut slide = Slide::new(doc);
        let report = slide.mount(&pipeline);
        assert_eq!(report.drawn, 0);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].1, "line 2: edge has no target node");

        let html = slide.markup();
        assert_eq!(html.matches("diagram-failed").count(), 2);
        assert!(html.contains("A --&gt;"));
        assert!(html.contains("this is not mermaid at all"));
        assert!(html.contains("<li>still listed</li>"));
    }
}
