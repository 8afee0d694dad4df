//! Syntax-highlighted code blocks.
//!
//! Uses [syntect](https://docs.rs/syntect) with its bundled Sublime grammars
//! and themes. Token colours are emitted as inline styles, so a rendered block
//! needs no external stylesheet beyond the small `.code-block` rules in
//! `static/style.css` (line layout and the line-number gutter).
//!
//! ## Degrading
//!
//! The printer never fails on content. A language tag syntect does not know
//! produces the same structure with unstyled, escaped lines. If the
//! highlighter errors part-way through a block, the whole block is re-rendered
//! unstyled rather than mixing styled and unstyled lines.

use maud::{Markup, PreEscaped, html};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, Theme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("unknown highlight theme '{name}' (available: {available})")]
    UnknownTheme { name: String, available: String },
}

/// Names of the bundled highlight themes, sorted.
pub fn theme_names() -> Vec<String> {
    ThemeSet::load_defaults().themes.into_keys().collect()
}

/// Pretty-printer for classified code blocks.
///
/// Construction loads the grammar and theme sets once; `render` is then pure
/// and can be shared across rayon workers.
pub struct CodePrinter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl CodePrinter {
    pub fn new(theme_name: &str) -> Result<Self, HighlightError> {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                let available = themes.keys().cloned().collect::<Vec<_>>().join(", ");
                return Err(HighlightError::UnknownTheme {
                    name: theme_name.to_string(),
                    available,
                });
            }
        };
        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        })
    }

    /// Render a code block as styled HTML.
    ///
    /// A single trailing newline is dropped so the block does not end with an
    /// empty numbered line. `language` of `None` renders unstyled.
    pub fn render(&self, text: &str, language: Option<&str>, show_line_numbers: bool) -> Markup {
        let text = text.strip_suffix('\n').unwrap_or(text);

        let lines = language
            .and_then(|lang| self.find_syntax(lang))
            .and_then(|syntax| self.highlight_lines(text, syntax))
            .unwrap_or_else(|| plain_lines(text));

        html! {
            div.code-block data-language=[language] {
                pre style=(self.pre_style()) {
                    code {
                        @for (idx, line) in lines.iter().enumerate() {
                            span.line {
                                @if show_line_numbers {
                                    span.line-number { (idx + 1) }
                                }
                                (line)
                            }
                        }
                    }
                }
            }
        }
    }

    /// Whether the printer has a grammar for `language` (after alias normalisation).
    pub fn supports(&self, language: &str) -> bool {
        self.find_syntax(language).is_some()
    }

    fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        let normalized = normalize_language(language);
        self.syntaxes.find_syntax_by_token(&normalized)
    }

    /// Highlight every line, or `None` if syntect reports an error on any of them.
    fn highlight_lines(&self, text: &str, syntax: &SyntaxReference) -> Option<Vec<Markup>> {
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(text) {
            let regions = highlighter.highlight_line(line, &self.syntaxes).ok()?;
            let html = styled_line_to_highlighted_html(&regions, IncludeBackground::No).ok()?;
            // Line breaks come from the `.line` spans, not the source text.
            lines.push(PreEscaped(html.replace('\n', "")));
        }
        if lines.is_empty() {
            lines.push(PreEscaped(String::new()));
        }
        Some(lines)
    }

    fn pre_style(&self) -> String {
        let background = self.theme.settings.background.map(css_color);
        let foreground = self.theme.settings.foreground.map(css_color);
        match (background, foreground) {
            (Some(bg), Some(fg)) => format!("background-color:{bg};color:{fg};"),
            (Some(bg), None) => format!("background-color:{bg};"),
            (None, Some(fg)) => format!("color:{fg};"),
            (None, None) => String::new(),
        }
    }
}

/// Escaped lines without token styling.
fn plain_lines(text: &str) -> Vec<Markup> {
    if text.is_empty() {
        return vec![html! {}];
    }
    text.lines().map(|line| html! { (line) }).collect()
}

fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Map common fence aliases to names syntect recognises.
fn normalize_language(lang: &str) -> String {
    let lang = lang.to_lowercase();
    match lang.as_str() {
        "py" | "python3" => "python".to_string(),
        "js" | "jsx" | "node" => "js".to_string(),
        "ts" | "typescript" | "tsx" => "ts".to_string(),
        "rs" => "rust".to_string(),
        "sh" | "shell" | "zsh" | "console" => "bash".to_string(),
        "yml" => "yaml".to_string(),
        "md" => "markdown".to_string(),
        "c++" | "cc" | "cxx" => "cpp".to_string(),
        "c#" | "csharp" => "cs".to_string(),
        _ => lang,
    }
}

/// An unstyled fenced block, used for blocks without a language tag.
pub fn plain_block(text: &str) -> Markup {
    html! {
        pre { code { (text) } }
    }
}

/// Inline code inside prose.
pub fn inline_code(text: &str) -> Markup {
    html! {
        code { (text) }
    }
}
