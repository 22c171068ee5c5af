mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::warn;

use super::FallbackReason;
use crate::config::{AiSettings, ProviderKind};

/// One remote LLM wire protocol.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends the system instruction and serialized context, returning the
    /// provider's text normalized to a plain string.
    async fn complete(&self, system: &str, context: &str) -> Result<String, FallbackReason>;
}

pub fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Builds the provider for the configured kind, or `None` when no usable key is set.
pub fn build(settings: &AiSettings) -> Option<Box<dyn Provider>> {
    if !settings.has_usable_key() {
        return None;
    }
    let client = http_client();
    let provider: Box<dyn Provider> = match settings.provider {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(client, settings.clone())),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(client, settings.clone())),
        ProviderKind::Google => Box::new(GeminiProvider::new(client, settings.clone())),
    };
    Some(provider)
}

/// Sends a prepared request and returns the body of a 2xx response.
async fn send(provider: &str, request: RequestBuilder) -> Result<String, FallbackReason> {
    let response = request
        .send()
        .await
        .map_err(|e| FallbackReason::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| FallbackReason::Transport(format!("Response read failed: {}", e)))?;

    if !status.is_success() {
        warn!("{} returned {}: {}", provider, status, truncate(&body, 300));
        return Err(FallbackReason::Status(status.as_u16()));
    }
    Ok(body)
}

fn non_empty(text: Option<String>) -> Result<String, FallbackReason> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(FallbackReason::EmptyResponse),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
