//! Document segmentation: group a file's pages into candidate documents.
//!
//! A "longlist" PDF is many CVs glued together. Each source CV usually
//! carries its own page footer ("Page 1 of 3"), so the first page of every
//! CV can be spotted by a small family of boundary markers. Pages between
//! two boundaries belong to the earlier one.
//!
//! ## Marker precedence
//!
//! Patterns are tried from most to least specific. The last one, a bare
//! `page 1` anywhere on the page, also fires on "page 10", "page 12 of 20" or
//! "see page 1" in a reference list. That over-segmentation is accepted: the
//! recall of the loose rule is what finds CVs whose footer got mangled.

use crate::config::SegmentationMode;
use crate::pipeline::text::PageText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separator placed between the texts of consecutive pages.
pub const PAGE_JOINER: &str = "\n\n";

/// A group of pages believed to be one person's CV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// 0-based index of the input file this document came from.
    pub file_index: usize,
    /// 1-based page numbers, strictly increasing.
    pub pages: Vec<usize>,
    /// Page texts joined with [`PAGE_JOINER`].
    pub text: String,
}

impl CandidateDocument {
    fn open(file_index: usize, page: &PageText) -> Self {
        Self {
            file_index,
            pages: vec![page.page_num],
            text: page.text.clone(),
        }
    }

    fn append(&mut self, page: &PageText) {
        self.pages.push(page.page_num);
        self.text.push_str(PAGE_JOINER);
        self.text.push_str(&page.text);
    }
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static BOUNDARY_MARKERS: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        Regex::new(r"page 1 of \d+").unwrap(),
        Regex::new(r"page 1 ?/ ?\d+").unwrap(),
        Regex::new(r"^1 of \d+").unwrap(),
        Regex::new(r"^1/\d+").unwrap(),
        Regex::new(r"page 1").unwrap(),
    ]
});

/// Collapse whitespace runs, trim and lowercase.
fn normalise(text: &str) -> String {
    RE_WHITESPACE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}

/// Does this page look like the first page of a new CV?
pub fn is_document_start(text: &str) -> bool {
    let normalised = normalise(text);
    BOUNDARY_MARKERS.iter().any(|re| re.is_match(&normalised))
}

/// Split one file's pages into candidate documents.
///
/// * `Individual`: always exactly one document spanning every page.
/// * `Longlist`: a new document at every boundary page. Pages before the
///   first boundary still form their own leading document rather than being
///   dropped; callers may filter such degenerate documents.
pub fn segment_pages(
    file_index: usize,
    pages: &[PageText],
    mode: SegmentationMode,
) -> Vec<CandidateDocument> {
    match mode {
        SegmentationMode::Individual => vec![CandidateDocument {
            file_index,
            pages: pages.iter().map(|p| p.page_num).collect(),
            text: pages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(PAGE_JOINER),
        }],
        SegmentationMode::Longlist => segment_longlist(file_index, pages),
    }
}

fn segment_longlist(file_index: usize, pages: &[PageText]) -> Vec<CandidateDocument> {
    let mut documents = Vec::new();
    let mut current: Option<CandidateDocument> = None;

    for page in pages {
        if is_document_start(&page.text) {
            debug!("File {}: page {} starts a new CV", file_index, page.page_num);
            if let Some(done) = current.take() {
                documents.push(done);
            }
            current = Some(CandidateDocument::open(file_index, page));
        } else {
            match current.as_mut() {
                Some(doc) => doc.append(page),
                None => current = Some(CandidateDocument::open(file_index, page)),
            }
        }
    }

    if let Some(done) = current {
        documents.push(done);
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<PageText> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| PageText {
                page_num: i + 1,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn marker_variants() {
        assert!(is_document_start("John Smith\nPage 1 of 3"));
        assert!(is_document_start("PAGE   1\tOF 12"));
        assert!(is_document_start("footer page 1 / 4"));
        assert!(is_document_start("page 1/4"));
        assert!(is_document_start("1 of 2\nCurriculum Vitae"));
        assert!(is_document_start("  1/3 Jane Doe"));
        assert!(is_document_start("see Page 1"));
    }

    #[test]
    fn non_markers() {
        assert!(!is_document_start("Page 2 of 3"));
        assert!(!is_document_start("Experience at Acme 1 of 2 projects"));
        assert!(!is_document_start("2/3"));
        assert!(!is_document_start(""));
    }

    #[test]
    fn loose_rule_fires_on_page_ten() {
        // Known over-match of the bare `page 1` rule.
        assert!(is_document_start("Page 10 of 12"));
    }

    #[test]
    fn longlist_splits_on_markers() {
        let input = pages(&["Page 1 of 2", "(content)", "Page 1 of 1", "(content)"]);
        let docs = segment_pages(0, &input, SegmentationMode::Longlist);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].pages, vec![1, 2]);
        assert_eq!(docs[1].pages, vec![3, 4]);
        assert_eq!(docs[0].text, "Page 1 of 2\n\n(content)");
    }

    #[test]
    fn leading_cover_page_becomes_its_own_document() {
        let input = pages(&["Shortlist cover", "Page 1 of 1 Alice", "Page 1 of 1 Bob"]);
        let docs = segment_pages(0, &input, SegmentationMode::Longlist);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].pages, vec![1]);
        assert_eq!(docs[1].pages, vec![2]);
        assert_eq!(docs[2].pages, vec![3]);
    }

    #[test]
    fn longlist_without_markers_is_one_document() {
        let input = pages(&["a", "b", "c"]);
        let docs = segment_pages(2, &input, SegmentationMode::Longlist);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].pages, vec![1, 2, 3]);
        assert_eq!(docs[0].file_index, 2);
    }

    #[test]
    fn every_page_a_marker_gives_one_page_documents() {
        let input = pages(&["page 1 of 1", "page 1 of 1", "page 1 of 1"]);
        let docs = segment_pages(0, &input, SegmentationMode::Longlist);
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.pages.len() == 1));
    }

    #[test]
    fn longlist_empty_input_gives_nothing() {
        assert!(segment_pages(0, &[], SegmentationMode::Longlist).is_empty());
    }

    #[test]
    fn individual_is_always_one_document() {
        let input = pages(&["Page 1 of 2", "x", "Page 1 of 1"]);
        let docs = segment_pages(0, &input, SegmentationMode::Individual);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].pages, vec![1, 2, 3]);
        assert_eq!(docs[0].text, "Page 1 of 2\n\nx\n\nPage 1 of 1");

        let empty = segment_pages(0, &[], SegmentationMode::Individual);
        assert_eq!(empty.len(), 1);
        assert!(empty[0].pages.is_empty());
        assert_eq!(empty[0].text, "");
    }

    #[test]
    fn k_markers_give_k_documents_when_first_page_matches() {
        let input = pages(&["page 1 of 2", "x", "y", "page 1 of 3", "page 1 of 9", "z"]);
        let docs = segment_pages(0, &input, SegmentationMode::Longlist);
        assert_eq!(docs.len(), 3);
        let all: Vec<usize> = docs.iter().flat_map(|d| d.pages.clone()).collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5, 6]);
    }
}
