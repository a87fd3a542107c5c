//! LLM backends behind one small trait.
//!
//! The extraction engine only needs "send a system + user prompt, get text
//! and token counts back, or an error that may carry a retry-after hint".
//! [`LlmClient`] is that seam:
//!
//! * [`http::HttpClient`]: direct BYOK calls to Gemini, OpenAI or Anthropic
//!   over `reqwest`. It reads `Retry-After` on HTTP 429.
//! * [`edgequake::EdgequakeClient`]: any provider `edgequake-llm` knows,
//!   credentials resolved from the environment by its `ProviderFactory`.
//!
//! Tests plug in scripted clients through the same trait.

pub mod edgequake;
pub mod http;

use crate::config::{PipelineConfig, ProviderKind};
use crate::error::CvError;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use edgequake::EdgequakeClient;
pub use http::{ApiFlavor, HttpClient};

/// One extraction call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub model: &'a str,
    pub api_key: Option<&'a str>,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Model text plus provider-reported token counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Coarse classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection, DNS, TLS or timeout failure.
    Network,
    /// Non-2xx status other than 401/403/429.
    Http(u16),
    /// HTTP 429.
    RateLimited,
    /// HTTP 401/403.
    Auth,
    /// 2xx with a body we could not read.
    InvalidResponse,
    /// Error surfaced by a wrapped backend library.
    Backend,
}

/// A failed provider call.
///
/// `retry_after` is set only when the provider said how long to wait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retry_after,
        }
    }
}

/// An LLM backend able to run one extraction call.
pub trait LlmClient: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Whether a caller-supplied API key is a precondition for calling.
    fn requires_api_key(&self) -> bool {
        true
    }

    fn complete<'a>(
        &'a self,
        request: CompletionRequest<'a>,
    ) -> BoxFuture<'a, Result<Completion, ProviderError>>;
}

/// Build the client selected by the configuration.
pub fn resolve_client(config: &PipelineConfig) -> Result<Arc<dyn LlmClient>, CvError> {
    let timeout = Duration::from_secs(config.api_timeout_secs);
    let base_url = config.provider.base_url.as_deref();

    let client: Arc<dyn LlmClient> = match &config.provider.kind {
        ProviderKind::Gemini => Arc::new(HttpClient::new(ApiFlavor::Gemini, base_url, timeout)?),
        ProviderKind::OpenAi => Arc::new(HttpClient::new(ApiFlavor::OpenAi, base_url, timeout)?),
        ProviderKind::Anthropic => {
            Arc::new(HttpClient::new(ApiFlavor::Anthropic, base_url, timeout)?)
        }
        ProviderKind::Edgequake(name) => {
            Arc::new(EdgequakeClient::new(name, config.provider.model())?)
        }
    };
    Ok(client)
}
