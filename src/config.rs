//! Configuration types for a CV extraction run.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Provider credentials travel inside the config
//! object and are handed to each call explicitly; nothing is kept in
//! module-level state.

use crate::error::CvError;
use crate::pipeline::extract::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lowest accepted concurrency level.
pub const MIN_CONCURRENCY: usize = 1;
/// Highest accepted concurrency level.
pub const MAX_CONCURRENCY: usize = 5;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use cvslides::{PipelineConfig, ProviderKind, ProviderTier, SegmentationMode};
///
/// let config = PipelineConfig::builder()
///     .mode(SegmentationMode::Individual)
///     .provider(ProviderKind::Gemini)
///     .api_key("AIza...")
///     .tier(ProviderTier::Paid)
///     .concurrency(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 3);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// How pages of one file are grouped into candidate documents. Default: longlist.
    pub mode: SegmentationMode,

    /// Documents submitted per batch. Range: 1–5. Default: 2.
    ///
    /// The orchestrator waits for a whole batch to settle before starting
    /// the next one, so this is also the ceiling on in-flight requests.
    pub concurrency: usize,

    /// Minimum spacing between two dispatches from the rate-limited queue.
    ///
    /// `None` means "derive from the tier": 4 s on the free tier (15 RPM),
    /// 500 ms on the paid tier.
    pub min_delay_ms: Option<u64>,

    /// Provider throughput tier. Selects the default delay and backoff ladder.
    pub tier: ProviderTier,

    /// Delay ladder between attempts. `None` means "derive from the tier".
    pub backoff: Option<BackoffPolicy>,

    /// Which backend to call and with which credentials.
    pub provider: ProviderSettings,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Extraction wants the most literal reading of the CV, not creativity.
    pub temperature: f32,

    /// Maximum output tokens per extraction call. Default: 2048.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Password for encrypted PDFs.
    pub pdf_password: Option<String>,

    /// Per-call HTTP timeout in seconds. Default: 90.
    ///
    /// A timed-out call counts as a failed attempt and is retried.
    pub api_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: SegmentationMode::default(),
            concurrency: 2,
            min_delay_ms: None,
            tier: ProviderTier::default(),
            backoff: None,
            provider: ProviderSettings::default(),
            temperature: 0.1,
            max_tokens: 2048,
            system_prompt: None,
            pdf_password: None,
            api_timeout_secs: 90,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("mode", &self.mode)
            .field("concurrency", &self.concurrency)
            .field("min_delay_ms", &self.effective_min_delay())
            .field("tier", &self.tier)
            .field("backoff", &self.effective_backoff())
            .field("provider", &self.provider)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pdf_password", &self.pdf_password.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The inter-dispatch delay actually used by the scheduler.
    pub fn effective_min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms.unwrap_or(match self.tier {
            ProviderTier::Free => 4_000,
            ProviderTier::Paid => 500,
        }))
    }

    /// The backoff ladder actually used by the engine.
    pub fn effective_backoff(&self) -> BackoffPolicy {
        self.backoff
            .clone()
            .unwrap_or_else(|| BackoffPolicy::for_tier(self.tier))
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn mode(mut self, mode: SegmentationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        self
    }

    pub fn min_delay_ms(mut self, ms: u64) -> Self {
        self.config.min_delay_ms = Some(ms);
        self
    }

    pub fn tier(mut self, tier: ProviderTier) -> Self {
        self.config.tier = tier;
        self
    }

    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.config.backoff = Some(policy);
        self
    }

    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.config.provider.kind = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.provider.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.provider.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.provider.base_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Concurrency needs no check here; the setter already clamps it.
    pub fn build(self) -> Result<PipelineConfig, CvError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(CvError::InvalidConfig("api_timeout_secs must be ≥ 1".into()));
        }
        if c.max_tokens == 0 {
            return Err(CvError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if let Some(ref url) = c.provider.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CvError::InvalidConfig(format!(
                    "base_url must be an HTTP(S) URL, got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the pages of one uploaded file become candidate documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    /// One PDF holds many concatenated CVs; split on boundary markers. (default)
    #[default]
    Longlist,
    /// The whole file is exactly one CV.
    Individual,
}

/// Provider throughput tier.
///
/// | Tier | Default spacing | Retry ladder |
/// |------|-----------------|--------------|
/// | Free | 4 s             | 15 s, 30 s   |
/// | Paid | 500 ms          | 2 s, 5 s     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    #[default]
    Free,
    Paid,
}

/// Which backend performs the extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Google Gemini `generateContent` REST API. (default)
    #[default]
    Gemini,
    /// OpenAI chat completions API.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Any provider known to `edgequake-llm` (credentials from the environment).
    Edgequake(String),
}

impl ProviderKind {
    /// Parse a CLI/env provider name. Unknown names go to `edgequake-llm`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => ProviderKind::Gemini,
            "openai" => ProviderKind::OpenAi,
            "anthropic" | "claude" => ProviderKind::Anthropic,
            other => ProviderKind::Edgequake(other.to_string()),
        }
    }

    /// Short provider name used in logs and error messages.
    pub fn name(&self) -> &str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Edgequake(name) => name,
        }
    }

    /// Model used when the caller does not pick one.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::OpenAi => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::Edgequake(_) => "gpt-4.1-mini",
        }
    }
}

/// Backend selection plus BYOK credentials.
#[derive(Clone, Default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Model identifier. If None, uses [`ProviderKind::default_model`].
    pub model: Option<String>,
    /// Caller-supplied API key.
    pub api_key: Option<String>,
    /// Override the API endpoint (proxies, gateways, local mocks).
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// The model that will actually be requested.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("model", &self.model())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}
