//! Run orchestration: files in, candidate records out.
//!
//! A [`Pipeline`] owns the decoder, the extractor and the scheduler, and
//! keeps the observable [`RunState`] behind a mutex so another task can poll
//! [`Pipeline::snapshot`] or call [`Pipeline::cancel`] while a run is going.

use crate::config::PipelineConfig;
use crate::error::CvError;
use crate::output::{ExtractionError, RunState, RunStatus, RunSummary};
use crate::pipeline::decode::{decode_blocking, PageDecoder, PdfiumDecoder};
use crate::pipeline::extract::Extractor;
use crate::pipeline::schedule::{BatchRun, CancelFlag, Scheduler};
use crate::pipeline::segment::{segment_pages, CandidateDocument};
use crate::pipeline::text::reconstruct_pages;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::provider::{resolve_client, LlmClient};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct Pipeline {
    config: PipelineConfig,
    decoder: Arc<dyn PageDecoder>,
    extractor: Arc<Extractor>,
    scheduler: Scheduler,
    state: Arc<Mutex<RunState>>,
    cancel: CancelFlag,
    progress: ProgressCallback,
}

impl Pipeline {
    /// Build a pipeline with the pdfium decoder and the configured provider.
    pub fn new(config: PipelineConfig) -> Result<Self, CvError> {
        let client = resolve_client(&config)?;
        let decoder = Arc::new(PdfiumDecoder::new(config.pdf_password.clone()));
        Ok(Self::with_parts(config, decoder, client))
    }

    /// Build a pipeline from explicit collaborators.
    pub fn with_parts(
        config: PipelineConfig,
        decoder: Arc<dyn PageDecoder>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        let extractor = Arc::new(Extractor::from_config(&config, client));
        let scheduler = Scheduler::new(config.concurrency, config.effective_min_delay());
        Self {
            config,
            decoder,
            extractor,
            scheduler,
            state: Arc::new(Mutex::new(RunState::default())),
            cancel: CancelFlag::new(),
            progress: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline over `files`, in order.
    ///
    /// Per-document failures land in the summary's `failures`. An `Err` is
    /// returned only when something outside per-document handling fails,
    /// such as a file that cannot be read; the state then moves to `error`
    /// and keeps whatever results were already collected.
    pub async fn run(&self, files: &[PathBuf]) -> Result<RunSummary, CvError> {
        let started = Instant::now();
        self.cancel.reset();
        *self.lock() = RunState {
            status: RunStatus::Parsing,
            ..RunState::default()
        };
        info!("Starting run over {} files", files.len());

        let result = self.run_inner(files).await;
        let mut state = self.lock();
        match result {
            Ok(outcome) => {
                state.status = match outcome {
                    BatchRun::Completed => RunStatus::Done,
                    BatchRun::Cancelled => RunStatus::Idle,
                };
                info!(
                    "Run {:?}: {} candidates, {} failures in {:?}",
                    state.status,
                    state.candidates.len(),
                    state.failures.len(),
                    started.elapsed()
                );
                let summary = RunSummary {
                    status: state.status,
                    documents: state.progress_total,
                    candidates: state.candidates.clone(),
                    failures: state.failures.clone(),
                    usage_totals: state.usage_totals,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
                drop(state);
                self.progress
                    .on_run_complete(summary.candidates.len(), summary.failures.len());
                Ok(summary)
            }
            Err(e) => {
                warn!("Run failed: {}", e);
                state.status = RunStatus::Error;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(&self, files: &[PathBuf]) -> Result<BatchRun, CvError> {
        // ── Parse ────────────────────────────────────────────────────────
        let mut documents: Vec<CandidateDocument> = Vec::new();
        for (file_index, path) in files.iter().enumerate() {
            let fragments = decode_blocking(self.decoder.clone(), path.clone()).await?;
            let pages = reconstruct_pages(fragments);
            let docs = segment_pages(file_index, &pages, self.config.mode);
            debug!(
                "{}: {} pages, {} documents",
                path.display(),
                pages.len(),
                docs.len()
            );
            documents.extend(docs);
        }

        let total = documents.len();
        {
            let mut state = self.lock();
            state.status = RunStatus::Extracting;
            state.progress_total = total;
        }
        info!("Extracting {} documents", total);
        self.progress.on_run_start(total);

        // ── Extract ──────────────────────────────────────────────────────
        let texts: Vec<String> = documents.into_iter().map(|d| d.text).collect();
        let extractor = self.extractor.clone();
        let job = move |text: String| {
            let extractor = extractor.clone();
            async move { extractor.extract(&text).await }
        };

        let outcome = self
            .scheduler
            .run_batches(texts.clone(), &self.cancel, job, |batch| {
                // Callbacks may poll `snapshot`, so they fire after the lock is released.
                let mut events = Vec::with_capacity(batch.len());
                let completed = {
                    let mut state = self.lock();
                    for (index, result) in batch {
                        let result = match result {
                            Ok(inner) => inner.map_err(|e| e.to_string()),
                            Err(queue) => Err(queue.to_string()),
                        };
                        match result {
                            Ok(extraction) => {
                                if let Some(usage) = &extraction.usage {
                                    state.usage_totals.add(usage);
                                }
                                events.push((index, Ok(extraction.record.name.clone())));
                                state.candidates.push(extraction.record);
                            }
                            Err(message) => {
                                warn!("Document {} failed: {}", index, message);
                                events.push((index, Err(message.clone())));
                                state.failures.push(ExtractionError {
                                    document_index: index,
                                    error_message: message,
                                    raw_text: texts[index].clone(),
                                });
                            }
                        }
                        state.progress_current += 1;
                    }
                    state.progress_current
                };

                for (index, event) in events {
                    match event {
                        Ok(name) => self.progress.on_document_complete(index, total, &name),
                        Err(message) => self.progress.on_document_error(index, total, &message),
                    }
                }
                self.progress.on_batch_complete(completed, total);
            })
            .await;

        Ok(outcome)
    }

    /// Ask the running batch loop to stop at the next batch boundary.
    /// Calls already in flight complete and their results are kept.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Clear results and return to `idle`.
    pub fn reset(&self) {
        self.cancel.reset();
        *self.lock() = RunState::default();
    }

    /// A copy of the current run state.
    pub fn snapshot(&self) -> RunState {
        self.lock().clone()
    }

    /// Batch size from the next batch on. Clamped to 1..=5.
    pub fn set_concurrency(&self, n: usize) {
        self.scheduler.set_concurrency(n);
    }

    /// Spacing between dispatches from the next dispatch on.
    pub fn set_min_delay(&self, delay: Duration) {
        self.scheduler.limiter().set_min_delay(delay);
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Synchronous wrapper around [`Pipeline::run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: PipelineConfig, files: &[PathBuf]) -> Result<RunSummary, CvError> {
    let pipeline = Pipeline::new(config)?;
    tokio::runtime::Runtime::new()
        .map_err(|e| CvError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(pipeline.run(files))
}
