//! Extraction scheduling: a serial rate-limited queue under a batch controller.
//!
//! ## Rate limiter
//!
//! [`RateLimiter`] keeps a FIFO of pending jobs drained by a single task.
//! Before each dispatch the drain task waits until `min_delay` has passed
//! since the previous dispatch, stamps the dispatch time, then spawns the job
//! without waiting for it. Dispatch is therefore spaced, but several jobs
//! can be in flight at once. The drain task exits when the queue empties and
//! is restarted by the next `enqueue`.
//!
//! ## Batches
//!
//! [`Scheduler::run_batches`] slices the work into batches of the current
//! concurrency level, pushes a whole batch through the limiter and waits for
//! all of it to settle before starting the next. The cancel flag and the
//! concurrency level are both read at batch boundaries only.

use futures::future::join_all;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::config::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Why a queued entry produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Request cancelled before dispatch")]
    Cancelled,
    #[error("Request panicked after dispatch")]
    Panicked,
}

type Job = Box<dyn FnOnce() + Send>;

struct QueueState {
    jobs: VecDeque<Job>,
    draining: bool,
    last_dispatch: Option<Instant>,
}

struct Shared {
    state: Mutex<QueueState>,
    min_delay_ms: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms.load(Ordering::Relaxed))
    }
}

/// Serial FIFO queue spacing dispatches by a minimum delay.
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    draining: false,
                    last_dispatch: None,
                }),
                min_delay_ms: AtomicU64::new(min_delay.as_millis() as u64),
            }),
        }
    }

    /// Queue `make` for dispatch. The returned future resolves with the
    /// output of the future `make` produces, [`QueueError::Cancelled`] if
    /// the entry was cancelled before it ran, or [`QueueError::Panicked`]
    /// if it ran and panicked.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue<F, Fut, T>(&self, make: F) -> impl Future<Output = Result<T, QueueError>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<JoinHandle<T>>();
        let job: Job = Box::new(move || {
            let _ = tx.send(tokio::spawn(async move { make().await }));
        });

        let start_drain = {
            let mut state = self.shared.lock();
            state.jobs.push_back(job);
            !std::mem::replace(&mut state.draining, true)
        };
        if start_drain {
            tokio::spawn(drain(self.shared.clone()));
        }

        async move {
            let handle = rx.await.map_err(|_| QueueError::Cancelled)?;
            handle.await.map_err(|e| {
                if e.is_panic() {
                    QueueError::Panicked
                } else {
                    QueueError::Cancelled
                }
            })
        }
    }

    /// Drop every job not yet dispatched. Their callers get
    /// [`QueueError::Cancelled`]. Returns how many were dropped.
    pub fn cancel(&self) -> usize {
        let dropped: Vec<Job> = self.shared.lock().jobs.drain(..).collect();
        if !dropped.is_empty() {
            debug!("Rate limiter: cancelled {} pending jobs", dropped.len());
        }
        dropped.len()
    }

    /// Change the spacing for dispatches from now on.
    pub fn set_min_delay(&self, delay: Duration) {
        self.shared
            .min_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn min_delay(&self) -> Duration {
        self.shared.min_delay()
    }

    /// Jobs queued but not yet dispatched.
    pub fn pending(&self) -> usize {
        self.shared.lock().jobs.len()
    }
}

enum Step {
    Dispatch(Job),
    Wait(Duration),
    Idle,
}

async fn drain(shared: Arc<Shared>) {
    loop {
        let step = {
            let mut state = shared.lock();
            let wait = state
                .last_dispatch
                .map(|t| (t + shared.min_delay()).saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::ZERO);
            if state.jobs.is_empty() {
                state.draining = false;
                Step::Idle
            } else if !wait.is_zero() {
                Step::Wait(wait)
            } else {
                state.last_dispatch = Some(Instant::now());
                state.jobs.pop_front().map_or(Step::Idle, Step::Dispatch)
            }
        };

        match step {
            Step::Dispatch(job) => job(),
            Step::Wait(wait) => tokio::time::sleep(wait).await,
            Step::Idle => return,
        }
    }
}

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How a batched run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRun {
    Completed,
    Cancelled,
}

/// Batch controller over a [`RateLimiter`].
pub struct Scheduler {
    limiter: RateLimiter,
    concurrency: AtomicUsize,
}

impl Scheduler {
    pub fn new(concurrency: usize, min_delay: Duration) -> Self {
        Self {
            limiter: RateLimiter::new(min_delay),
            concurrency: AtomicUsize::new(concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::Relaxed)
    }

    /// Takes effect at the next batch boundary. Clamped to 1..=5.
    pub fn set_concurrency(&self, n: usize) {
        self.concurrency
            .store(n.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY), Ordering::Relaxed);
    }

    /// Run `job` over `items` batch by batch.
    ///
    /// `on_batch` receives each settled batch as `(index, result)` pairs,
    /// where `index` is the item's position in `items`. Results inside a
    /// batch are in submission order; one entry failing never affects the
    /// others.
    pub async fn run_batches<D, T, F, Fut, B>(
        &self,
        items: Vec<D>,
        cancel: &CancelFlag,
        job: F,
        mut on_batch: B,
    ) -> BatchRun
    where
        D: Send + 'static,
        T: Send + 'static,
        F: Fn(D) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        B: FnMut(Vec<(usize, Result<T, QueueError>)>),
    {
        let mut remaining = items.into_iter().enumerate().peekable();

        while remaining.peek().is_some() {
            if cancel.is_cancelled() {
                debug!("Cancel requested; stopping before next batch");
                return BatchRun::Cancelled;
            }

            let size = self.concurrency();
            let submitted: Vec<_> = remaining
                .by_ref()
                .take(size)
                .map(|(idx, item)| {
                    let job = job.clone();
                    let entry = self.limiter.enqueue(move || job(item));
                    async move { (idx, entry.await) }
                })
                .collect();
            debug!("Dispatching batch of {}", submitted.len());

            on_batch(join_all(submitted).await);
        }

        BatchRun::Completed
    }
}
