//! Adapter from `edgequake-llm` providers to [`LlmClient`].
//!
//! Credentials are resolved by `ProviderFactory` from the provider's usual
//! environment variables, so no API key is passed per request.

use crate::error::CvError;
use crate::provider::{
    Completion, CompletionRequest, LlmClient, ProviderError, ProviderErrorKind,
};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;

pub struct EdgequakeClient {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl EdgequakeClient {
    /// Instantiate `provider_name` with `model` through the factory.
    pub fn new(provider_name: &str, model: &str) -> Result<Self, CvError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            CvError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::from_provider(provider_name, provider))
    }

    /// Wrap an already-built provider.
    pub fn from_provider(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

impl LlmClient for EdgequakeClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    fn complete<'a>(
        &'a self,
        request: CompletionRequest<'a>,
    ) -> BoxFuture<'a, Result<Completion, ProviderError>> {
        Box::pin(async move {
            let messages = vec![
                ChatMessage::system(request.system),
                ChatMessage::user(request.prompt),
            ];
            let options = CompletionOptions {
                temperature: Some(request.temperature),
                max_tokens: Some(request.max_tokens),
                ..Default::default()
            };

            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| ProviderError::new(ProviderErrorKind::Backend, format!("{e}")))?;

            Ok(Completion {
                text: response.content,
                input_tokens: response.prompt_tokens as u64,
                output_tokens: response.completion_tokens as u64,
            })
        })
    }
}
