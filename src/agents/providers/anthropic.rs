use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{non_empty, send, Provider};
use crate::agents::FallbackReason;
use crate::config::AiSettings;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

pub struct AnthropicProvider {
    client: Client,
    settings: AiSettings,
}

impl AnthropicProvider {
    pub fn new(client: Client, settings: AiSettings) -> Self {
        Self { client, settings }
    }

    fn body<'a>(&'a self, system: &'a str, context: &'a str) -> ClaudeRequest<'a> {
        ClaudeRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content: context,
            }],
        }
    }

    /// Concatenates the text blocks of a messages response.
    pub fn extract_text(body: &str) -> Result<String, FallbackReason> {
        let parsed: ClaudeResponse =
            serde_json::from_str(body).map_err(|e| FallbackReason::Parse(e.to_string()))?;
        let text: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();
        non_empty(Some(text.join("")))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, system: &str, context: &str) -> Result<String, FallbackReason> {
        let url = format!("{}/messages", self.settings.endpoint());
        info!("Generating with model {} via anthropic", self.settings.model);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.body(system, context));

        let body = send(self.name(), request).await?;
        Self::extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_and_sampling() {
        let provider = AnthropicProvider::new(
            Client::new(),
            AiSettings {
                model: "claude-3-haiku-20240307".into(),
                max_tokens: 800,
                temperature: 0.3,
                ..AiSettings::default()
            },
        );
        let json = serde_json::to_value(provider.body("Be kind", "{\"title\":\"Box\"}")).unwrap();
        assert_eq!(json["model"], "claude-3-haiku-20240307");
        assert_eq!(json["system"], "Be kind");
        assert_eq!(json["max_tokens"], 800);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn text_blocks_are_joined() {
        let body = r#"{"content":[{"type":"text","text":"Hello "},{"type":"tool_use"},{"type":"text","text":"there"}]}"#;
        assert_eq!(AnthropicProvider::extract_text(body).unwrap(), "Hello there");
    }

    #[test]
    fn empty_content_is_rejected() {
        assert_eq!(
            AnthropicProvider::extract_text(r#"{"content":[]}"#),
            Err(FallbackReason::EmptyResponse)
        );
        assert!(matches!(
            AnthropicProvider::extract_text("not json"),
            Err(FallbackReason::Parse(_))
        ));
    }
}
