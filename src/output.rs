//! Result types produced by an extraction run.
//!
//! [`CandidateRecord`] is the sole hand-off to the slide emitter: its work
//! history is already capped and ordered, its education list is rendered
//! as-is. Field names serialise in camelCase so the JSON matches what the
//! slide templates consume.

use crate::error::CvError;
use crate::usage::UsageTotals;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name used when the model does not return one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// One operational role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub company: String,
    pub job_title: String,
    /// `MM/YYYY - MM/YYYY` or `MM/YYYY - Present`; passed through unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
}

/// One education entry. A missing degree is legitimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    /// `YYYY - YYYY`; passed through unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
}

/// A successfully extracted candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub name: String,
    /// At most 5 entries, most recent first, board roles removed.
    pub work_history: Vec<WorkExperience>,
    pub education: Vec<EducationEntry>,
    /// Text of the source document, kept for audit.
    pub raw_text: String,
}

/// A document whose extraction failed after every retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionError {
    /// Position in the run's overall document list.
    pub document_index: usize,
    pub error_message: String,
    pub raw_text: String,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Parsing,
    Extracting,
    Done,
    Error,
}

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub status: RunStatus,
    pub progress_current: usize,
    pub progress_total: usize,
    pub candidates: Vec<CandidateRecord>,
    pub failures: Vec<ExtractionError>,
    pub usage_totals: UsageTotals,
    /// Message of the fatal error that moved the run to `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What [`crate::run::Pipeline::run`] hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub status: RunStatus,
    pub documents: usize,
    pub candidates: Vec<CandidateRecord>,
    pub failures: Vec<ExtractionError>,
    pub usage_totals: UsageTotals,
    pub duration_ms: u64,
}

impl RunSummary {
    /// `true` when the run stopped early on user request.
    pub fn was_cancelled(&self) -> bool {
        self.status == RunStatus::Idle
    }
}

/// Write a run's state as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn save_results(path: &Path, state: &RunState) -> Result<(), CvError> {
    let write_err = |source: std::io::Error| CvError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(state)
        .map_err(|e| CvError::Internal(format!("Failed to serialise results: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_degree_is_omitted_not_empty() {
        let e = EducationEntry {
            institution: "ETH Zürich".into(),
            degree: None,
            dates: Some("2010 - 2014".into()),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("degree").is_none());
        assert_eq!(json["dates"], "2010 - 2014");
    }

    #[test]
    fn record_uses_camel_case() {
        let r = CandidateRecord {
            name: "Ada".into(),
            work_history: vec![WorkExperience {
                company: "Acme".into(),
                job_title: "CTO".into(),
                dates: None,
            }],
            education: vec![],
            raw_text: "...".into(),
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["workHistory"][0]["jobTitle"], "CTO");
        assert!(json.get("rawText").is_some());
    }

    #[test]
    fn status_serialises_lowercase() {
        assert_eq!(
            serde_json::to_value(RunStatus::Extracting).unwrap(),
            "extracting"
        );
    }

    #[tokio::test]
    async fn save_results_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results.json");
        let state = RunState {
            status: RunStatus::Done,
            progress_current: 1,
            progress_total: 1,
            ..Default::default()
        };
        save_results(&path, &state).await.unwrap();

        let back: RunState =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.status, RunStatus::Done);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
