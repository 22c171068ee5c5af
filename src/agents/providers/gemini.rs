use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{non_empty, send, Provider};
use crate::agents::FallbackReason;
use crate::config::AiSettings;

#[derive(Serialize)]
struct GeminiRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    client: Client,
    settings: AiSettings,
}

impl GeminiProvider {
    pub fn new(client: Client, settings: AiSettings) -> Self {
        Self { client, settings }
    }

    fn body<'a>(&'a self, system: &'a str, context: &'a str) -> GeminiRequest<'a> {
        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: context }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        }
    }

    pub fn extract_text(body: &str) -> Result<String, FallbackReason> {
        let parsed: GeminiResponse =
            serde_json::from_str(body).map_err(|e| FallbackReason::Parse(e.to_string()))?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            });
        non_empty(text)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn complete(&self, system: &str, context: &str) -> Result<String, FallbackReason> {
        let model = self.settings.model.trim().trim_start_matches("models/");
        let url = format!("{}/{}:generateContent", self.settings.endpoint(), model);
        info!("Generating with model {} via google", model);

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .header("Content-Type", "application/json")
            .json(&self.body(system, context));

        let body = send(self.name(), request).await?;
        Self::extract_text(&body)
    }
}
