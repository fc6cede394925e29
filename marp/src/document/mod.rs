pub mod frontmatter;
pub mod variables;

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::code;

pub const SECTION_SEP: &str = "---";
pub const LINE_FEED: &str = "\n";
/// Separator placed between two sections when a document is written back out.
pub const NEXT_SECTION_SEP: &str = "\n\n---\n\n";

/// A line holding exactly `---` (a trailing `\r` is tolerated).
static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---\r?$").unwrap());

/// A slide: the text between two separator lines, trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub text: &'a str,
    /// Byte offset of `text` within the source document.
    pub offset: usize,
}

impl Section<'_> {
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.text.len()
    }

    /// Iterate over the physical lines of the section with their byte offset in the source.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        let base = self.offset;
        let mut cursor = 0;
        self.text.split('\n').map(move |raw| {
            let start = base + cursor;
            cursor += raw.len() + 1;
            (start, raw.strip_suffix('\r').unwrap_or(raw))
        })
    }
}

/// Split a document into sections at `---` lines.
///
/// Pieces that are completely empty (two adjacent separators, or a separator
/// on the very first line) are dropped; whitespace-only pieces survive as
/// empty sections so that the section count round-trips.
pub fn split_sections(source: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut start = 0;

    for separator in SEPARATOR_LINE.find_iter(source) {
        push_section(source, start..separator.start(), &mut sections);
        start = separator.end();
    }
    push_section(source, start..source.len(), &mut sections);

    sections
}

fn push_section<'a>(source: &'a str, range: Range<usize>, out: &mut Vec<Section<'a>>) {
    if range.is_empty() {
        return;
    }
    let piece = &source[range.clone()];
    let leading = piece.len() - piece.trim_start().len();
    out.push(Section {
        text: piece.trim(),
        offset: range.start + leading,
    });
}

/// Join processed sections back into a document and drop leftover setup regions.
pub fn reassemble<S: AsRef<str>>(sections: &[S]) -> String {
    let mut out = String::from(SECTION_SEP);
    out.push_str(LINE_FEED);
    out.push_str(LINE_FEED);

    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push_str(NEXT_SECTION_SEP);
        }
        out.push_str(section.as_ref());
    }

    code::strip_setup_regions(&out)
}
