//! Code block classification.
//!
//! Every fenced, indented or inline code node in a slide is routed to exactly
//! one render path, decided from its language tag and whether it sits inline
//! in prose. Contents are never inspected: an author forces any block onto any
//! path purely through the fence tag.
//!
//! | Input | Path |
//! |-------|------|
//! | inline span, any tag | [`RenderPath::PlainCode`] (rendered as inline `<code>`) |
//! | block tagged `mermaid` | [`RenderPath::Diagram`] |
//! | block tagged anything else | [`RenderPath::HighlightedCode`] |
//! | block without a tag | [`RenderPath::PlainCode`] |

/// The fence tag that routes a block to the diagram renderer.
pub const DIAGRAM_SENTINEL: &str = "mermaid";

/// Which renderer handles a code node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPath {
    /// Compiled by the diagram renderer in the draw phase.
    Diagram,
    /// Passed to the pretty-printer with the tag verbatim as the grammar name.
    HighlightedCode(String),
    /// Escaped text without styling.
    PlainCode,
}

/// Classify a code node by its tag alone.
///
/// Total over all inputs. An unknown tag still yields
/// [`RenderPath::HighlightedCode`]; the printer degrades it to unstyled output.
pub fn classify(tag: Option<&str>, is_inline: bool) -> RenderPath {
    if is_inline {
        return RenderPath::PlainCode;
    }
    match tag {
        Some(DIAGRAM_SENTINEL) => RenderPath::Diagram,
        Some(tag) if !tag.is_empty() => RenderPath::HighlightedCode(tag.to_string()),
        _ => RenderPath::PlainCode,
    }
}

/// Extract the language tag from a fence info string.
///
/// Only the first whitespace-separated word counts, so ```` ```python title="x" ````
/// is tagged `python`. Returns `None` for an empty info string.
pub fn fence_tag(info: &str) -> Option<&str> {
    info.split_whitespace().next()
}
