//! Extraction engine: one candidate document in, one record (or error) out.
//!
//! ## Retry strategy
//!
//! Every provider failure and every unparseable answer is transient. The
//! engine makes at most [`MAX_ATTEMPTS`] calls, walking an explicit state
//! machine:
//!
//! ```text
//! Attempting(n) ──ok──▶ Succeeded
//!      │
//!      └─err─▶ BackingOff(n, delay) ──sleep──▶ Attempting(n+1)   (n < 3)
//!      └─err─▶ Failed                                            (n = 3)
//! ```
//!
//! The delay is the provider's retry-after hint when one was given, otherwise
//! a fixed ladder that depends on the tier. No jitter, no exponential growth.

use crate::config::{PipelineConfig, ProviderTier};
use crate::error::EngineError;
use crate::output::CandidateRecord;
use crate::pipeline::response::parse_candidate;
use crate::prompts::{extraction_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::provider::{CompletionRequest, LlmClient};
use crate::usage::Usage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Calls made per document before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed delays between attempts.
///
/// `ladder[0]` is waited after the first failure, `ladder[1]` after the
/// second. When the ladder is shorter than needed its last step repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    ladder: Vec<Duration>,
}

impl BackoffPolicy {
    pub fn new(ladder: Vec<Duration>) -> Self {
        Self { ladder }
    }

    pub fn for_tier(tier: ProviderTier) -> Self {
        let secs: &[u64] = match tier {
            ProviderTier::Free => &[15, 30],
            ProviderTier::Paid => &[2, 5],
        };
        Self::new(secs.iter().copied().map(Duration::from_secs).collect())
    }

    /// Delay before attempt `attempt + 1`, given that attempt `attempt`
    /// (1-based) just failed.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        let idx = (attempt.max(1) - 1) as usize;
        self.ladder
            .get(idx)
            .or_else(|| self.ladder.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Where the retry loop is.
#[derive(Debug, Clone, PartialEq)]
enum AttemptState {
    Attempting(u32),
    BackingOff { attempt: u32, delay: Duration },
    Succeeded,
    Failed,
}

/// A successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: CandidateRecord,
    /// Usage of the successful call only.
    pub usage: Option<Usage>,
}

/// Prompt, call, parse and clean, with bounded retries.
pub struct Extractor {
    client: Arc<dyn LlmClient>,
    model: String,
    api_key: Option<String>,
    backoff: BackoffPolicy,
    temperature: f32,
    max_tokens: usize,
    system_prompt: String,
}

impl Extractor {
    pub fn from_config(config: &PipelineConfig, client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            model: config.provider.model().to_string(),
            api_key: config.provider.api_key.clone(),
            backoff: config.effective_backoff(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Extract one candidate from `text`.
    pub async fn extract(&self, text: &str) -> Result<Extraction, EngineError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        if self.client.requires_api_key() && api_key.is_none() {
            return Err(EngineError::MissingApiKey {
                provider: self.client.name().to_string(),
            });
        }

        let prompt = extraction_prompt(text);
        let request = CompletionRequest {
            system: &self.system_prompt,
            prompt: &prompt,
            model: &self.model,
            api_key,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut state = AttemptState::Attempting(1);
        let mut last_error = String::new();
        let mut outcome = None;

        loop {
            state = match state {
                AttemptState::Attempting(attempt) => {
                    match self.attempt(request, text).await {
                        Ok(extraction) => {
                            outcome = Some(extraction);
                            AttemptState::Succeeded
                        }
                        Err((message, retry_after)) => {
                            warn!(
                                "{}: attempt {}/{} failed: {}",
                                self.client.name(),
                                attempt,
                                MAX_ATTEMPTS,
                                message
                            );
                            last_error = message;
                            if attempt < MAX_ATTEMPTS {
                                AttemptState::BackingOff {
                                    attempt,
                                    delay: self.backoff.delay_for(attempt, retry_after),
                                }
                            } else {
                                AttemptState::Failed
                            }
                        }
                    }
                }
                AttemptState::BackingOff { attempt, delay } => {
                    debug!("Backing off {:?} before attempt {}", delay, attempt + 1);
                    tokio::time::sleep(delay).await;
                    AttemptState::Attempting(attempt + 1)
                }
                AttemptState::Succeeded | AttemptState::Failed => break,
            };
        }

        outcome.ok_or(EngineError::AttemptsExhausted {
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }

    /// One call. The error side carries the message and any retry-after hint.
    async fn attempt(
        &self,
        request: CompletionRequest<'_>,
        text: &str,
    ) -> Result<Extraction, (String, Option<Duration>)> {
        let completion = self
            .client
            .complete(request)
            .await
            .map_err(|e| (e.message, e.retry_after))?;

        let record = parse_candidate(&completion.text, text).map_err(|e| (e, None))?;
        let usage = Usage::for_model(&self.model, completion.input_tokens, completion.output_tokens);

        Ok(Extraction {
            record,
            usage: Some(usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::provider::{Completion, ProviderError, ProviderErrorKind};
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicU32,
        needs_key: bool,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                needs_key: true,
            })
        }
    }

    impl LlmClient for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn requires_api_key(&self) -> bool {
            self.needs_key
        }

        fn complete<'a>(
            &'a self,
            _request: CompletionRequest<'a>,
        ) -> BoxFuture<'a, Result<Completion, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::new(ProviderErrorKind::Network, "script empty")));
            Box::pin(async move {
                reply.map(|text| Completion {
                    text,
                    input_tokens: 100,
                    output_tokens: 20,
                })
            })
        }
    }

    fn extractor(client: Arc<Scripted>, tier: ProviderTier, key: Option<&str>) -> Extractor {
        let mut b = PipelineConfig::builder()
            .provider(ProviderKind::Gemini)
            .tier(tier);
        if let Some(k) = key {
            b = b.api_key(k);
        }
        Extractor::from_config(&b.build().unwrap(), client)
    }

    #[test]
    fn ladders_per_tier() {
        let free = BackoffPolicy::for_tier(ProviderTier::Free);
        assert_eq!(free.delay_for(1, None), Duration::from_secs(15));
        assert_eq!(free.delay_for(2, None), Duration::from_secs(30));
        let paid = BackoffPolicy::for_tier(ProviderTier::Paid);
        assert_eq!(paid.delay_for(1, None), Duration::from_secs(2));
        assert_eq!(paid.delay_for(2, None), Duration::from_secs(5));
        assert!(paid.delay_for(1, None) < free.delay_for(1, None));
    }

    #[test]
    fn retry_after_overrides_ladder() {
        let paid = BackoffPolicy::for_tier(ProviderTier::Paid);
        assert_eq!(
            paid.delay_for(1, Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn short_ladder_repeats_last_step() {
        let p = BackoffPolicy::new(vec![Duration::from_millis(10)]);
        assert_eq!(p.delay_for(5, None), Duration::from_millis(10));
        assert_eq!(BackoffPolicy::new(vec![]).delay_for(1, None), Duration::ZERO);
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling() {
        let client = Scripted::new(vec![Ok("{}".into())]);
        let ex = extractor(client.clone(), ProviderTier::Paid, None);
        let err = ex.extract("cv").await.unwrap_err();
        assert!(matches!(err, EngineError::MissingApiKey { .. }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_bad_json() {
        let client = Scripted::new(vec![
            Ok("not json".into()),
            Ok(r#"{"name": "Ada Lovelace"}"#.into()),
        ]);
        let ex = extractor(client.clone(), ProviderTier::Paid, Some("k"));
        let started = tokio::time::Instant::now();
        let out = ex.extract("cv").await.unwrap();
        assert_eq!(out.record.name, "Ada Lovelace");
        assert_eq!(out.usage.unwrap().total_tokens, 120);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_three_attempts() {
        let client = Scripted::new(vec![
            Err(ProviderError::new(ProviderErrorKind::Http(500), "HTTP 500: a")),
            Err(ProviderError::new(ProviderErrorKind::Http(500), "HTTP 500: b")),
            Err(ProviderError::new(ProviderErrorKind::Http(503), "HTTP 503: c")),
            Ok("{}".into()),
        ]);
        let ex = extractor(client.clone(), ProviderTier::Free, Some("k"));
        let err = ex.extract("cv").await.unwrap_err();
        assert_eq!(
            err,
            EngineError::AttemptsExhausted {
                attempts: 3,
                last_error: "HTTP 503: c".into()
            }
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }
}
