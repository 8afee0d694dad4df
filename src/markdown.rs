//! Markdown formatting with a code block hook.
//!
//! Prose goes through pulldown-cmark's HTML writer unchanged. Every code node
//! (fenced, indented or inline) is intercepted, classified by its tag, and
//! handed to a [`BlockHook`] which decides what takes its place.
//!
//! A hook either returns finished markup, which is spliced straight into the
//! event stream, or claims a [`Fragment::Slot`]: a hole in the output the
//! caller fills later. Slide diagrams use slots so their placeholder can be
//! swapped for SVG without re-formatting the document.

use crate::classify::{self, RenderPath};
use maud::Markup;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

/// Grammar extensions enabled for slide documents.
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// What a hook puts in place of a code node.
pub enum BlockOutput {
    Markup(Markup),
    /// Reserve slot `n`; the caller supplies its markup at assembly time.
    Slot(usize),
}

/// Per-document renderer for classified code nodes.
pub trait BlockHook {
    /// Render a block-level code node. `code` is the raw block text.
    fn render_block(&mut self, path: RenderPath, code: &str) -> BlockOutput;

    /// Render an inline code span.
    fn render_inline(&mut self, code: &str) -> Markup {
        crate::highlight::inline_code(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Html(String),
    Slot(usize),
}

/// A formatted document: static HTML interleaved with hook-owned slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatted {
    pub fragments: Vec<Fragment>,
}

impl Formatted {
    /// Concatenate the fragments, asking `fill` for each slot's markup.
    pub fn assemble(&self, mut fill: impl FnMut(usize) -> String) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Html(html) => out.push_str(html),
                Fragment::Slot(n) => out.push_str(&fill(*n)),
            }
        }
        out
    }

    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Slot(n) => Some(*n),
            Fragment::Html(_) => None,
        })
    }
}

/// Format one document.
///
/// Sibling order is preserved exactly. Malformed tables and lists never
/// abort formatting: the grammar reads them as paragraph text, so they come
/// out as their raw source.
pub fn format(document: &str, hook: &mut dyn BlockHook) -> Formatted {
    let parser = Parser::new_ext(document, parser_options());

    let mut fragments = Vec::new();
    let mut events: Vec<Event<'_>> = Vec::new();
    // (tag, accumulated text) of the code block being read
    let mut code_block: Option<(Option<String>, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let tag = match &kind {
                    CodeBlockKind::Fenced(info) => classify::fence_tag(info).map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                code_block = Some((tag, String::new()));
            }
            Event::Text(text) if code_block.is_some() => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                let Some((tag, code)) = code_block.take() else {
                    continue;
                };
                let path = classify::classify(tag.as_deref(), false);
                match hook.render_block(path, &code) {
                    BlockOutput::Markup(markup) => {
                        events.push(Event::Html(CowStr::from(markup.into_string())));
                    }
                    BlockOutput::Slot(n) => {
                        flush(&mut events, &mut fragments);
                        fragments.push(Fragment::Slot(n));
                    }
                }
            }
            Event::Code(code) => {
                let markup = hook.render_inline(&code);
                events.push(Event::InlineHtml(CowStr::from(markup.into_string())));
            }
            other => events.push(other),
        }
    }
    flush(&mut events, &mut fragments);

    Formatted { fragments }
}

fn flush(events: &mut Vec<Event<'_>>, fragments: &mut Vec<Fragment>) {
    if events.is_empty() {
        return;
    }
    let mut out = String::new();
    html::push_html(&mut out, events.drain(..));
    fragments.push(Fragment::Html(out));
}

#[cfg(test)]
mod tests {
    use super::*;
    use maud::html;

    /// Records every call and renders blocks as tagged markers.
    #[derive(Default)]
    struct RecordingHook {
        blocks: Vec<(RenderPath, String)>,
        inline: Vec<String>,
        slots: usize,
    }

    impl BlockHook for RecordingHook {
        fn render_block(&mut self, path: RenderPath, code: &str) -> BlockOutput {
            self.blocks.push((path.clone(), code.to_string()));
            match path {
                RenderPath::Diagram => {
                    self.slots += 1;
                    BlockOutput::Slot(self.slots - 1)
                }
                RenderPath::HighlightedCode(lang) => {
                    BlockOutput::Markup(html! { div.hl data-lang=(lang) { (code) } })
                }
                RenderPath::PlainCode => BlockOutput::Markup(html! { pre.plain { (code) } }),
            }
        }

        fn render_inline(&mut self, code: &str) -> Markup {
            self.inline.push(code.to_string());
            html! { code.inline { (code) } }
        }
    }

    fn render(doc: &str) -> (String, RecordingHook) {
        let mut hook = RecordingHook::default();
        let formatted = format(doc, &mut hook);
        let html = formatted.assemble(|n| format!("[slot {n}]"));
        (html, hook)
    }

    #[test]
    fn prose_passes_through() {
        let (html, hook) = render("# Title\n\nSome **bold** and *italic* text.\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
        assert!(hook.blocks.is_empty());
    }

    #[test]
    fn nested_lists_keep_depth_and_order() {
        let (html, _) = render("- one\n  - one.a\n  - one.b\n- two\n");
        let one = html.find("one").unwrap();
        let one_a = html.find("one.a").unwrap();
        let one_b = html.find("one.b").unwrap();
        let two = html.find("two").unwrap();
        assert!(one < one_a && one_a < one_b && one_b < two);
        assert_eq!(html.matches("<ul>").count(), 2);
    }

    #[test]
    fn tables_are_first_class() {
        let (html, _) = render("| Tool | Year |\n|------|------|\n| Cas9 | 2012 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Tool</th>"));
        assert!(html.contains("<td>Cas9</td>"));
    }

    #[test]
    fn malformed_table_falls_back_to_text() {
        let (html, _) = render("| a | b |\n|---|\n| 1 | 2 |\n\nAfter.\n");
        assert!(!html.contains("<table>"));
        assert!(html.contains("| a | b |"));
        assert!(html.contains("<p>After.</p>"));
    }

    #[test]
    fn fenced_blocks_are_classified_by_tag() {
        let doc = "```python\nprint(1)\n```\n\n```\nplain\n```\n\n```mermaid\nA --> B\n```\n";
        let (html, hook) = render(doc);
        assert_eq!(
            hook.blocks,
            vec![
                (RenderPath::HighlightedCode("python".into()), "print(1)\n".into()),
                (RenderPath::PlainCode, "plain\n".into()),
                (RenderPath::Diagram, "A --> B\n".into()),
            ]
        );
        assert!(html.contains(r#"<div class="hl" data-lang="python">"#));
        assert!(html.contains(r#"<pre class="plain">"#));
        assert!(html.contains("[slot 0]"));
    }

    #[test]
    fn info_string_extras_are_ignored() {
        let (_, hook) = render("```python title=\"x.py\"\npass\n```\n");
        assert_eq!(hook.blocks[0].0, RenderPath::HighlightedCode("python".into()));
    }

    #[test]
    fn indented_block_is_plain() {
        let (_, hook) = render("Para.\n\n    indented code\n");
        assert_eq!(hook.blocks[0], (RenderPath::PlainCode, "indented code\n".into()));
    }

    #[test]
    fn inline_code_goes_to_inline_hook() {
        let (html, hook) = render("Call `cas9()` now.\n");
        assert_eq!(hook.inline, vec!["cas9()".to_string()]);
        assert!(hook.blocks.is_empty());
        assert!(html.contains(r#"<p>Call <code class="inline">cas9()</code> now.</p>"#));
    }

    #[test]
    fn inline_code_in_table_body_keeps_cells() {
        let (html, _) = render("| a |\n|---|\n| `x` |\n");
        assert!(html.contains(r#"<td><code class="inline">x</code></td>"#));
    }

    #[test]
    fn slots_split_fragments_in_order() {
        let mut hook = RecordingHook::default();
        let formatted = format(
            "Before\n\n```mermaid\nA\n```\n\nMiddle\n\n```mermaid\nB\n```\n\nAfter\n",
            &mut hook,
        );
        assert_eq!(formatted.slots().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(formatted.fragments.len(), 5);
        let html = formatted.assemble(|n| format!("<slot{n}/>"));
        let before = html.find("Before").unwrap();
        let s0 = html.find("<slot0/>").unwrap();
        let middle = html.find("Middle").unwrap();
        let s1 = html.find("<slot1/>").unwrap();
        let after = html.find("After").unwrap();
        assert!(before < s0 && s0 < middle && middle < s1 && s1 < after);
    }

    #[test]
    fn diagram_inside_list_item() {
        let (html, hook) = render("- step\n\n  ```mermaid\n  A --> B\n  ```\n- next\n");
        assert_eq!(hook.blocks[0].0, RenderPath::Diagram);
        assert!(html.contains("[slot 0]"));
        assert!(html.find("[slot 0]").unwrap() < html.find("next").unwrap());
    }

    #[test]
    fn empty_document() {
        let mut hook = RecordingHook::default();
        assert_eq!(format("", &mut hook), Formatted::default());
    }
}
