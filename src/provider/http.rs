//! Direct BYOK HTTP backends: Gemini, OpenAI and Anthropic.
//!
//! Each request carries the caller's key; nothing is read from the
//! environment here. On HTTP 429 the `Retry-After` header (delta-seconds) is
//! parsed into [`ProviderError::retry_after`]. Gemini often omits the header
//! and puts a `RetryInfo.retryDelay` such as `"17s"` in the error body
//! instead, which is used as a fallback.

use crate::error::CvError;
use crate::provider::{
    Completion, CompletionRequest, LlmClient, ProviderError, ProviderErrorKind,
};
use futures::future::BoxFuture;
use reqwest::header::RETRY_AFTER;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Wire format spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    Gemini,
    OpenAi,
    Anthropic,
}

impl ApiFlavor {
    pub fn name(self) -> &'static str {
        match self {
            ApiFlavor::Gemini => "gemini",
            ApiFlavor::OpenAi => "openai",
            ApiFlavor::Anthropic => "anthropic",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            ApiFlavor::Gemini => "https://generativelanguage.googleapis.com",
            ApiFlavor::OpenAi => "https://api.openai.com",
            ApiFlavor::Anthropic => "https://api.anthropic.com",
        }
    }
}

/// `reqwest`-based client for one provider.
pub struct HttpClient {
    flavor: ApiFlavor,
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(
        flavor: ApiFlavor,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, CvError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CvError::ProviderNotConfigured {
                provider: flavor.name().to_string(),
                hint: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            flavor,
            base_url: base_url
                .unwrap_or_else(|| flavor.default_base_url())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    async fn send(&self, req: CompletionRequest<'_>) -> Result<Completion, ProviderError> {
        let key = req.api_key.ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::Auth, "No API key supplied")
        })?;

        let builder = match self.flavor {
            ApiFlavor::Gemini => self
                .client
                .post(format!(
                    "{}/v1beta/models/{}:generateContent",
                    self.base_url, req.model
                ))
                .header("x-goog-api-key", key)
                .json(&gemini_body(&req)),
            ApiFlavor::OpenAi => self
                .client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(key)
                .json(&openai_body(&req)),
            ApiFlavor::Anthropic => self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01")
                .json(&anthropic_body(&req)),
        };

        let response = builder.send().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::Network, format!("Request failed: {e}"))
        })?;

        let status = response.status();
        let header_hint = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::Network, format!("Reading body failed: {e}"))
        })?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), header_hint, &body));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                format!("Response is not JSON: {e}"),
            )
        })?;
        let completion = parse_completion(self.flavor, &value)?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.flavor.name(),
            completion.input_tokens,
            completion.output_tokens
        );
        Ok(completion)
    }
}

impl LlmClient for HttpClient {
    fn name(&self) -> &str {
        self.flavor.name()
    }

    fn complete<'a>(
        &'a self,
        request: CompletionRequest<'a>,
    ) -> BoxFuture<'a, Result<Completion, ProviderError>> {
        Box::pin(self.send(request))
    }
}

// ── Request bodies ───────────────────────────────────────────────────────

fn gemini_body(req: &CompletionRequest<'_>) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": req.system }] },
        "contents": [{ "role": "user", "parts": [{ "text": req.prompt }] }],
        "generationConfig": {
            "temperature": req.temperature,
            "maxOutputTokens": req.max_tokens,
            "responseMimeType": "application/json",
        },
    })
}

fn openai_body(req: &CompletionRequest<'_>) -> Value {
    json!({
        "model": req.model,
        "messages": [
            { "role": "system", "content": req.system },
            { "role": "user", "content": req.prompt },
        ],
        "temperature": req.temperature,
        "max_completion_tokens": req.max_tokens,
        "response_format": { "type": "json_object" },
    })
}

fn anthropic_body(req: &CompletionRequest<'_>) -> Value {
    json!({
        "model": req.model,
        "system": req.system,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
        "messages": [{ "role": "user", "content": req.prompt }],
    })
}

// ── Responses ────────────────────────────────────────────────────────────

fn token_count(value: &Value) -> u64 {
    value.as_u64().unwrap_or(0)
}

/// Pull the text and token counts out of a 2xx body.
pub(crate) fn parse_completion(flavor: ApiFlavor, v: &Value) -> Result<Completion, ProviderError> {
    let (text, input_tokens, output_tokens) = match flavor {
        ApiFlavor::Gemini => {
            let text = v["candidates"][0]["content"]["parts"]
                .as_array()
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p["text"].as_str())
                        .collect::<String>()
                })
                .filter(|t| !t.is_empty());
            let text = match text {
                Some(t) => t,
                None => {
                    let reason = v["candidates"][0]["finishReason"]
                        .as_str()
                        .or_else(|| v["promptFeedback"]["blockReason"].as_str())
                        .unwrap_or("no candidates");
                    return Err(ProviderError::new(
                        ProviderErrorKind::InvalidResponse,
                        format!("Gemini returned no text ({reason})"),
                    ));
                }
            };
            (
                text,
                token_count(&v["usageMetadata"]["promptTokenCount"]),
                token_count(&v["usageMetadata"]["candidatesTokenCount"]),
            )
        }
        ApiFlavor::OpenAi => {
            let text = v["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| {
                    ProviderError::new(
                        ProviderErrorKind::InvalidResponse,
                        "OpenAI response has no message content",
                    )
                })?
                .to_string();
            (
                text,
                token_count(&v["usage"]["prompt_tokens"]),
                token_count(&v["usage"]["completion_tokens"]),
            )
        }
        ApiFlavor::Anthropic => {
            let text: String = v["content"]
                .as_array()
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter(|b| b["type"] == "text")
                        .filter_map(|b| b["text"].as_str())
                        .collect()
                })
                .unwrap_or_default();
            if text.is_empty() {
                return Err(ProviderError::new(
                    ProviderErrorKind::InvalidResponse,
                    "Anthropic response has no text block",
                ));
            }
            (
                text,
                token_count(&v["usage"]["input_tokens"]),
                token_count(&v["usage"]["output_tokens"]),
            )
        }
    };

    Ok(Completion {
        text,
        input_tokens,
        output_tokens,
    })
}

/// Map a non-2xx response to a [`ProviderError`].
pub(crate) fn status_error(status: u16, header_hint: Option<Duration>, body: &str) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| truncate(body, 200));
    let message = format!("HTTP {status}: {detail}");

    match status {
        429 => {
            let hint = header_hint.or_else(|| parsed.as_ref().and_then(gemini_retry_delay));
            ProviderError::rate_limited(message, hint)
        }
        401 | 403 => ProviderError::new(ProviderErrorKind::Auth, message),
        _ => ProviderError::new(ProviderErrorKind::Http(status), message),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}\u{2026}")
    }
}

/// Longest server-requested wait honoured before a retry.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Parse a `Retry-After` value given in seconds, capped at
/// [`MAX_RETRY_AFTER`]. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let v = value.trim();
    if let Ok(secs) = v.parse::<u64>() {
        return Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER));
    }
    v.parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s.min(MAX_RETRY_AFTER.as_secs_f64()))
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

/// Gemini's `google.rpc.RetryInfo` detail, e.g. `{"retryDelay": "17s"}`.
fn gemini_retry_delay(body: &Value) -> Option<Duration> {
    body["error"]["details"]
        .as_array()?
        .iter()
        .filter(|d| {
            d["@type"]
                .as_str()
                .map(|t| t.ends_with("RetryInfo"))
                .unwrap_or(false)
        })
        .find_map(|d| d["retryDelay"].as_str())
        .and_then(|s| parse_retry_after(s.trim_end_matches('s')))
}
