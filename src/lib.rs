//! # cvslides
//!
//! Turn a stack of CV PDFs into structured candidate records, one per CV,
//! ready to be laid out as presentation slides.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Decode    positioned text fragments via pdfium (spawn_blocking)
//!  ├─ 2. Lines     rebuild lines from vertical positions
//!  ├─ 3. Segment   split longlists into one document per candidate
//!  ├─ 4. Schedule  rate-limited FIFO queue, driven in batches of 1–5
//!  ├─ 5. Extract   LLM call with bounded retries and tier-based backoff
//!  └─ 6. Clean     trim, cap to 5 roles, drop board roles
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cvslides::{Pipeline, PipelineConfig, ProviderKind, SegmentationMode};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .mode(SegmentationMode::Longlist)
//!         .provider(ProviderKind::Gemini)
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let pipeline = Pipeline::new(config)?;
//!     let summary = pipeline.run(&[PathBuf::from("longlist.pdf")]).await?;
//!     for c in &summary.candidates {
//!         println!("{}: {} roles", c.name, c.work_history.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cvslides` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! ## Choosing a Model
//!
//! | Provider | Default model | $/1M in / out |
//! |----------|---------------|---------------|
//! | `gemini` | `gemini-2.0-flash` | $0.10 / $0.40 |
//! | `openai` | `gpt-4.1-mini` | $0.40 / $1.60 |
//! | `anthropic` | `claude-sonnet-4-20250514` | $3.00 / $15.00 |
//!
//! Free-tier keys are throttled hard; the default `Free` tier spaces calls
//! 4 s apart and backs off 15 s then 30 s.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod run;
pub mod usage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    PipelineConfig, PipelineConfigBuilder, ProviderKind, ProviderSettings, ProviderTier,
    SegmentationMode,
};
pub use error::{CvError, EngineError};
pub use output::{
    save_results, CandidateRecord, EducationEntry, ExtractionError, RunState, RunStatus,
    RunSummary, WorkExperience,
};
pub use pipeline::extract::{BackoffPolicy, Extraction, Extractor};
pub use pipeline::schedule::{CancelFlag, QueueError, RateLimiter, Scheduler};
pub use pipeline::segment::CandidateDocument;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{LlmClient, ProviderError, ProviderErrorKind};
pub use run::{run_sync, Pipeline};
pub use usage::{Usage, UsageTotals};
