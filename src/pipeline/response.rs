//! Model response handling: fence stripping and JSON parsing.
//!
//! Even when told not to, models regularly wrap JSON in a ```` ```json ````
//! fence. The fence is stripped first, then the payload is deserialised into
//! a permissive shape (every field optional) and handed to
//! [`crate::pipeline::clean`]. A payload that is not JSON, or whose values
//! have the wrong types, is a parse error and the caller retries.

use crate::output::{CandidateRecord, UNKNOWN_NAME};
use crate::pipeline::clean::{clean_education, clean_field, clean_work_history, RawEducation, RawWork};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static RE_LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(?:json)?\s*").unwrap());
static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// The permissive top-level payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    work_history: Option<Vec<RawWork>>,
    #[serde(default)]
    education: Option<Vec<RawEducation>>,
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` and a trailing ```` ``` ````.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = RE_LEADING_FENCE
        .find(trimmed)
        .map(|m| m.end())
        .unwrap_or(0);
    let body = &trimmed[start..];
    let end = RE_TRAILING_FENCE
        .find(body)
        .map(|m| m.start())
        .unwrap_or(body.len());
    &body[..end]
}

/// Parse and clean a model response into a record.
///
/// `raw_text` is the source document's text, stored on the record.
pub fn parse_candidate(response: &str, raw_text: &str) -> Result<CandidateRecord, String> {
    let payload = strip_code_fence(response);
    let parsed: RawCandidate = serde_json::from_str(payload)
        .map_err(|e| format!("Invalid JSON in model response: {e}"))?;

    Ok(CandidateRecord {
        name: clean_field(parsed.name).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        work_history: clean_work_history(parsed.work_history.unwrap_or_default()),
        education: clean_education(parsed.education.unwrap_or_default()),
        raw_text: raw_text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"name\": \"A\"}\n```";
        assert_eq!(strip_code_fence(raw), "{\"name\": \"A\"}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn unfenced_is_untouched() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn parses_full_payload() {
        let raw = r#"```json
{
  "name": "  Grace Hopper ",
  "workHistory": [
    {"company": "US Navy", "jobTitle": "Rear Admiral", "dates": "08/1973 - 08/1986"},
    {"company": "Remington Rand", "jobTitle": "Senior Mathematician"},
    {"company": "Harvard", "jobTitle": "Board Advisor"}
  ],
  "education": [
    {"institution": "Yale University", "degree": "PhD Mathematics", "dates": "1930 - 1934"},
    {"institution": "Vassar College"}
  ]
}
```"#;
        let rec = parse_candidate(raw, "source").unwrap();
        assert_eq!(rec.name, "Grace Hopper");
        assert_eq!(rec.work_history.len(), 2);
        assert_eq!(rec.work_history[1].dates, None);
        assert_eq!(rec.education.len(), 2);
        assert_eq!(rec.education[1].degree, None);
        assert_eq!(rec.raw_text, "source");
    }

    #[test]
    fn missing_or_null_name_is_unknown() {
        let rec = parse_candidate(r#"{"workHistory": []}"#, "").unwrap();
        assert_eq!(rec.name, UNKNOWN_NAME);
        let rec = parse_candidate(r#"{"name": null, "education": null}"#, "").unwrap();
        assert_eq!(rec.name, UNKNOWN_NAME);
        assert!(rec.education.is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = parse_candidate("Sorry, I cannot read this CV.", "").unwrap_err();
        assert!(err.contains("Invalid JSON"), "got: {err}");
    }

    #[test]
    fn wrong_shape_is_an_error() {
        assert!(parse_candidate(r#"{"workHistory": "none"}"#, "").is_err());
        assert!(parse_candidate(r#""just a sentence""#, "").is_err());
    }
}
