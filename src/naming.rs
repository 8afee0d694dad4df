//! File-name parsing for the `NNN-name` convention.
//!
//! Slide files carry an optional numeric prefix (`NNN-`) followed by a name.
//! The number decides deck order; files without one are rendered but left out
//! of the deck sequence.
//!
//! ## Display Titles
//!
//! Dashes in the name portion become spaces for display:
//! - `010-introduction` → "introduction"
//! - `030-how-Cas9-cuts` → "how Cas9 cuts"
//! - `speaker-notes` → "speaker notes"

/// Result of parsing a slide file stem like `030-how-Cas9-cuts`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (`30` from `030-how-Cas9-cuts`)
    pub number: Option<u32>,
    /// Name part after `NNN-`, dashes preserved. Empty if number-only.
    /// For unnumbered stems, this is the full input.
    pub name: String,
    /// Lowercased name, used for output file names.
    pub slug: String,
    /// Name with dashes converted to spaces.
    pub display_title: String,
}

impl ParsedName {
    fn new(number: Option<u32>, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
            slug: name.to_lowercase(),
            display_title: name.replace('-', " "),
        }
    }
}

/// Parse a file stem following the `NNN-name` convention.
///
/// - `"020-Guide-RNA"` → number=Some(20), name="Guide-RNA", slug="guide-rna", display_title="Guide RNA"
/// - `"001"` → number=Some(1), name="", display_title=""
/// - `"001-"` → number=Some(1), name="", display_title=""
/// - `"appendix"` → number=None, name="appendix"
/// - `"speaker-notes"` → number=None, display_title="speaker notes"
pub fn parse_entry_name(stem: &str) -> ParsedName {
    if let Some((prefix, rest)) = stem.split_once('-')
        && let Ok(num) = prefix.parse::<u32>()
    {
        return ParsedName::new(Some(num), rest);
    }
    if let Ok(num) = stem.parse::<u32>() {
        return ParsedName::new(Some(num), "");
    }
    ParsedName::new(None, stem)
}

/// Output file name of the deck slide at 1-based `position`.
pub fn deck_page_name(position: usize) -> String {
    format!("{position}.html")
}

/// Output file name of an unnumbered slide.
pub fn extra_page_name(slug: &str) -> String {
    format!("{slug}.html")
}
