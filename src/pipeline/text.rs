//! Line reconstruction from positioned text fragments.
//!
//! PDF text layers carry no notion of "line": a page is a bag of text runs,
//! each with a position. We rebuild approximate visual lines by watching the
//! vertical coordinate: a jump of more than [`LINE_TOLERANCE`] starts a new
//! line, anything smaller continues the current one with a single space.
//!
//! Fragments on the same baseline but emitted right-to-left by the parser are
//! not reordered. This is a known limitation, not a layout engine.

use serde::{Deserialize, Serialize};

/// Maximum vertical drift, in layout units, still treated as the same line.
pub const LINE_TOLERANCE: f32 = 2.0;

/// One positioned run of text as emitted by the PDF decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    /// Vertical (baseline) coordinate.
    pub y: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, y: f32) -> Self {
        Self {
            text: text.into(),
            y,
        }
    }
}

/// One page's reconstructed plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number within its file.
    pub page_num: usize,
    pub text: String,
}

/// Rebuild the line structure of a single page.
pub fn reconstruct_lines(fragments: &[TextFragment]) -> String {
    let mut out = String::new();
    let mut last_y: Option<f32> = None;

    for fragment in fragments {
        if let Some(prev) = last_y {
            if (fragment.y - prev).abs() > LINE_TOLERANCE {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(&fragment.text);
        last_y = Some(fragment.y);
    }

    out
}

/// Reconstruct every page of a decoded file, numbering pages from 1.
pub fn reconstruct_pages(pages: Vec<Vec<TextFragment>>) -> Vec<PageText> {
    pages
        .iter()
        .enumerate()
        .map(|(idx, fragments)| PageText {
            page_num: idx + 1,
            text: reconstruct_lines(fragments),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_is_empty_string() {
        assert_eq!(reconstruct_lines(&[]), "");
    }

    #[test]
    fn same_baseline_joins_with_space() {
        let frags = [
            TextFragment::new("Jane", 700.0),
            TextFragment::new("Doe", 700.0),
            TextFragment::new("CV", 701.5),
        ];
        assert_eq!(reconstruct_lines(&frags), "Jane Doe CV");
    }

    #[test]
    fn vertical_jump_starts_new_line() {
        let frags = [
            TextFragment::new("Experience", 650.0),
            TextFragment::new("Acme Corp", 630.0),
            TextFragment::new("2019 - 2023", 630.0),
            TextFragment::new("Education", 600.0),
        ];
        assert_eq!(
            reconstruct_lines(&frags),
            "Experience\nAcme Corp 2019 - 2023\nEducation"
        );
    }

    #[test]
    fn tolerance_boundary_is_exclusive() {
        let frags = [TextFragment::new("a", 100.0), TextFragment::new("b", 102.0)];
        assert_eq!(reconstruct_lines(&frags), "a b");
        let frags = [TextFragment::new("a", 100.0), TextFragment::new("b", 102.5)];
        assert_eq!(reconstruct_lines(&frags), "a\nb");
    }

    #[test]
    fn fragment_text_is_kept_verbatim() {
        let frags = [
            TextFragment::new("  padded ", 10.0),
            TextFragment::new("", 10.0),
        ];
        assert_eq!(reconstruct_lines(&frags), "  padded  ");
    }

    #[test]
    fn compares_against_previous_fragment_not_line_start() {
        // Gradual drift of 1.5 per fragment never exceeds the tolerance.
        let frags = [
            TextFragment::new("a", 100.0),
            TextFragment::new("b", 101.5),
            TextFragment::new("c", 103.0),
        ];
        assert_eq!(reconstruct_lines(&frags), "a b c");
    }

    #[test]
    fn pages_are_numbered_from_one() {
        let pages = reconstruct_pages(vec![
            vec![TextFragment::new("first", 1.0)],
            vec![],
            vec![TextFragment::new("third", 1.0)],
        ]);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].page_num, 1);
        assert_eq!(pages[1].text, "");
        assert_eq!(pages[2].page_num, 3);
    }
}
