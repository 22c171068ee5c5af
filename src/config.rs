use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub demo_mode: bool,
    pub upload_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub ai: AiSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let demo_mode = std::env::var("DEMO_MODE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let upload_folder = base_dir.join(
            std::env::var("UPLOAD_FOLDER").unwrap_or_else(|_| "uploads".to_string())
        );

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .unwrap_or(5001);

        Ok(Self {
            database_url,
            demo_mode,
            upload_folder,
            host,
            port,
            ai: AiSettings::from_env()?,
        })
    }

    /// The in-memory store is used when demo mode is forced or no database is configured.
    pub fn use_memory_store(&self) -> bool {
        self.demo_mode || self.database_url.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(alias = "openai-compatible")]
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    #[serde(alias = "gemini")]
    Google,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-20240620",
            ProviderKind::Google => "gemini-1.5-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Google => "https://generativelanguage.googleapis.com/v1beta/models",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
        })
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "openai" | "openai-compatible" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "google" | "gemini" => Ok(ProviderKind::Google),
            other => Err(format!("unknown AI provider: {}", other)),
        }
    }
}

/// Settings handed to the content engine at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    pub provider: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub mock_delay_ms: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: String::new(),
            model: ProviderKind::OpenAi.default_model().to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            base_url: None,
            mock_delay_ms: 0,
        }
    }
}

impl AiSettings {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let provider: ProviderKind = std::env::var("AI_PROVIDER")
            .unwrap_or_default()
            .parse()?;

        let model = std::env::var("AI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            provider,
            api_key: std::env::var("AI_API_KEY").unwrap_or_default(),
            model,
            temperature: std::env::var("AI_TEMPERATURE")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.7),
            max_tokens: std::env::var("AI_MAX_TOKENS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(1000),
            base_url: std::env::var("AI_BASE_URL").ok().filter(|u| !u.trim().is_empty()),
            mock_delay_ms: std::env::var("MOCK_DELAY_MS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0),
        })
    }

    /// Applies a persisted settings document over these values, field by field.
    pub fn merged_with(&self, stored: &serde_json::Value) -> Self {
        let mut merged = self.clone();
        if let Some(provider) = stored
            .get("provider")
            .and_then(|v| v.as_str())
            .and_then(|p| p.parse::<ProviderKind>().ok())
        {
            if provider != merged.provider {
                merged.model = provider.default_model().to_string();
            }
            merged.provider = provider;
        }
        if let Some(key) = stored.get("api_key").and_then(|v| v.as_str()) {
            merged.api_key = key.to_string();
        }
        if let Some(model) = stored.get("model").and_then(|v| v.as_str()) {
            if !model.trim().is_empty() {
                merged.model = model.to_string();
            }
        }
        if let Some(t) = stored.get("temperature").and_then(|v| v.as_f64()) {
            merged.temperature = t as f32;
        }
        if let Some(m) = stored.get("max_tokens").and_then(|v| v.as_u64()) {
            merged.max_tokens = m as u32;
        }
        if let Some(url) = stored.get("base_url").and_then(|v| v.as_str()) {
            merged.base_url = Some(url.to_string()).filter(|u| !u.trim().is_empty());
        }
        merged
    }

    pub fn has_usable_key(&self) -> bool {
        let key = self.api_key.trim().to_lowercase();
        !(key.is_empty()
            || key.starts_with("your")
            || key.contains("placeholder")
            || key.starts_with("sk-xxx")
            || key == "changeme")
    }

    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Copy safe to return from the settings API. Short keys are hidden entirely.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        let len = masked.api_key.chars().count();
        if len > 8 {
            let tail: String = masked.api_key.chars().skip(len - 4).collect();
            masked.api_key = format!("****{}", tail);
        } else if len > 0 {
            masked.api_key = "****".to_string();
        }
        masked
    }
}
