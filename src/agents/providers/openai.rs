use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{non_empty, send, Provider};
use crate::agents::FallbackReason;
use crate::config::AiSettings;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-style chat completions; also serves compatible gateways via `base_url`.
pub struct OpenAiProvider {
    client: Client,
    settings: AiSettings,
}

impl OpenAiProvider {
    pub fn new(client: Client, settings: AiSettings) -> Self {
        Self { client, settings }
    }

    fn body<'a>(&'a self, system: &'a str, context: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    pub fn extract_text(body: &str) -> Result<String, FallbackReason> {
        let parsed: ChatResponse =
            serde_json::from_str(body).map_err(|e| FallbackReason::Parse(e.to_string()))?;
        non_empty(
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        )
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, system: &str, context: &str) -> Result<String, FallbackReason> {
        let url = format!("{}/chat/completions", self.settings.endpoint());
        info!("Generating with model {} via openai", self.settings.model);

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&self.body(system, context));

        let body = send(self.name(), request).await?;
        Self::extract_text(&body)
    }
}
