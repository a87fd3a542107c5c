//! Validation and normalisation of extracted CV fields.
//!
//! The model is asked to follow the extraction rules, but its answer is not
//! trusted: incomplete entries are dropped, strings are trimmed, the work
//! history is capped, and board-type roles are filtered again client-side.
//! Every rule is a pure function over owned data, and running the whole
//! pass twice yields the same output.

use crate::output::{EducationEntry, WorkExperience};
use serde::Deserialize;

/// Most work entries kept per candidate.
pub const MAX_WORK_ENTRIES: usize = 5;

/// Case-insensitive substrings that mark a non-operational board role.
pub const BOARD_ROLE_KEYWORDS: &[&str] = &[
    "board member",
    "board director",
    "advisory board",
    "board of directors",
    "non-executive director",
    "supervisory board",
    "board observer",
    "board advisor",
];

/// A work entry as the model returned it, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWork {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
}

/// An education entry as the model returned it, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEducation {
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
}

/// Trim; empty after trimming counts as absent.
pub fn clean_field(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn is_board_role(job_title: &str) -> bool {
    let title = job_title.to_lowercase();
    BOARD_ROLE_KEYWORDS.iter().any(|kw| title.contains(kw))
}

/// Drop incomplete entries, keep the first five, then drop board roles.
pub fn clean_work_history(raw: Vec<RawWork>) -> Vec<WorkExperience> {
    let complete: Vec<WorkExperience> = raw
        .into_iter()
        .filter_map(|w| {
            Some(WorkExperience {
                company: clean_field(w.company)?,
                job_title: clean_field(w.job_title)?,
                dates: clean_field(w.dates),
            })
        })
        .take(MAX_WORK_ENTRIES)
        .collect();

    filter_board_roles(complete)
}

/// Client-side board filter, applied even if the prompt already excluded them.
pub fn filter_board_roles(entries: Vec<WorkExperience>) -> Vec<WorkExperience> {
    entries
        .into_iter()
        .filter(|w| !is_board_role(&w.job_title))
        .collect()
}

/// Drop entries without an institution; a missing degree stays `None`.
pub fn clean_education(raw: Vec<RawEducation>) -> Vec<EducationEntry> {
    raw.into_iter()
        .filter_map(|e| {
            Some(EducationEntry {
                institution: clean_field(e.institution)?,
                degree: clean_field(e.degree),
                dates: clean_field(e.dates),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(company: &str, title: &str) -> RawWork {
        RawWork {
            company: Some(company.into()),
            job_title: Some(title.into()),
            dates: None,
        }
    }

    fn back_to_raw(entries: &[WorkExperience]) -> Vec<RawWork> {
        entries
            .iter()
            .map(|w| RawWork {
                company: Some(w.company.clone()),
                job_title: Some(w.job_title.clone()),
                dates: w.dates.clone(),
            })
            .collect()
    }

    #[test]
    fn board_keywords_are_case_insensitive() {
        assert!(is_board_role("BOARD MEMBER"));
        assert!(is_board_role("Board Member"));
        assert!(is_board_role("Independent Non-Executive Director"));
        assert!(is_board_role("Member of the Supervisory Board"));
        assert!(!is_board_role("Director of Engineering"));
        assert!(!is_board_role("Chief Executive Officer"));
    }

    #[test]
    fn incomplete_work_entries_are_dropped() {
        let raw = vec![
            RawWork {
                company: Some("Acme".into()),
                job_title: None,
                dates: None,
            },
            RawWork {
                company: Some("   ".into()),
                job_title: Some("CFO".into()),
                dates: None,
            },
            work("  Globex ", " VP Sales  "),
        ];
        let cleaned = clean_work_history(raw);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].company, "Globex");
        assert_eq!(cleaned[0].job_title, "VP Sales");
    }

    #[test]
    fn six_entries_with_board_role() {
        let raw = vec![
            work("Acme", "Board Member"),
            work("A", "CEO"),
            work("B", "COO"),
            work("C", "VP"),
            work("D", "Director"),
            work("E", "Manager"),
        ];
        let cleaned = clean_work_history(raw);
        assert!(cleaned.len() <= MAX_WORK_ENTRIES);
        assert!(cleaned.iter().all(|w| !is_board_role(&w.job_title)));
        assert!(cleaned.iter().all(|w| w.company != "Acme"));
        // Truncation happens before the board filter.
        assert_eq!(
            cleaned.iter().map(|w| w.company.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "C", "D"]
        );
    }

    #[test]
    fn cleaning_is_idempotent() {
        let raw = vec![
            work(" A ", "CEO"),
            work("B", "advisory board member"),
            work("C", " CTO"),
            RawWork::default(),
            work("D", "VP"),
            work("E", "Head"),
            work("F", "Lead"),
        ];
        let once = clean_work_history(raw);
        let twice = clean_work_history(back_to_raw(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn education_keeps_missing_degree() {
        let raw = vec![
            RawEducation {
                institution: Some(" INSEAD ".into()),
                degree: None,
                dates: Some("2001 - 2002".into()),
            },
            RawEducation {
                institution: Some("Oxford".into()),
                degree: Some("  ".into()),
                dates: None,
            },
            RawEducation {
                institution: None,
                degree: Some("MBA".into()),
                dates: None,
            },
        ];
        let cleaned = clean_education(raw);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].institution, "INSEAD");
        assert_eq!(cleaned[0].degree, None);
        assert_eq!(cleaned[1].degree, None);
    }

    #[test]
    fn malformed_dates_pass_through() {
        let cleaned = clean_work_history(vec![RawWork {
            company: Some("Acme".into()),
            job_title: Some("CTO".into()),
            dates: Some("since spring '19".into()),
        }]);
        assert_eq!(cleaned[0].dates.as_deref(), Some("since spring '19"));
    }
}
