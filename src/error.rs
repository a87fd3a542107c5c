//! Error types for the cvslides library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CvError`]: **Fatal**: the run cannot proceed at all (missing input
//!   file, unreadable PDF, provider not configured). Returned as
//!   `Err(CvError)` from [`crate::run::Pipeline::run`] and moves the run to
//!   the `error` state.
//!
//! * [`EngineError`]: **Non-fatal**: a single candidate document could not
//!   be extracted. It is rendered into an
//!   [`crate::output::ExtractionError`] record and the other documents carry
//!   on untouched.
//!
//! Per-call provider failures live in [`crate::provider::ProviderError`];
//! the engine folds them into [`EngineError::AttemptsExhausted`] once the
//! retry budget is spent.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cvslides library.
#[derive(Debug, Error)]
pub enum CvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The text layer of a page could not be read.
    #[error("Text extraction failed for page {page} of '{path}': {detail}")]
    TextLayerFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the results file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single candidate document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No API key was configured for a backend that needs one.
    /// Reported before any network call and never retried.
    #[error("No API key configured for provider '{provider}'")]
    MissingApiKey { provider: String },

    /// Every attempt failed; carries the last underlying failure.
    #[error("Extraction failed after {attempts} attempts: {last_error}")]
    AttemptsExhausted { attempts: u32, last_error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_exhausted_mentions_last_error() {
        let e = EngineError::AttemptsExhausted {
            attempts: 3,
            last_error: "HTTP 503: overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("HTTP 503: overloaded"), "got: {msg}");
    }

    #[test]
    fn missing_api_key_display() {
        let e = EngineError::MissingApiKey {
            provider: "gemini".into(),
        };
        assert!(e.to_string().contains("gemini"));
    }

    #[test]
    fn not_a_pdf_display() {
        let e = CvError::NotAPdf {
            path: PathBuf::from("cv.docx"),
            magic: *b"PK\x03\x04",
        };
        assert!(e.to_string().contains("cv.docx"));
    }

    #[test]
    fn text_layer_display() {
        let e = CvError::TextLayerFailed {
            path: PathBuf::from("longlist.pdf"),
            page: 4,
            detail: "no text page".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 4"), "got: {msg}");
        assert!(msg.contains("longlist.pdf"), "got: {msg}");
    }
}
