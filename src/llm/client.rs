//! LLM client trait and the OpenAI-compatible backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmProvider;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatRole};

/// LLM client trait. One method: a chat completion returning the raw
/// assistant text. Everything downstream treats that text as untyped.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a chat request.
    async fn chat(&self, request: ChatRequest) -> Result<String>;

    /// Which backend this client talks to.
    fn provider(&self) -> LlmProvider;
}

/// Configuration for the OpenAI-compatible client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key (ignored by most local servers)
    pub api_key: String,
    /// Base URL, e.g. `http://localhost:11434/v1`
    pub base_url: String,
    /// Model name sent in every request
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Preset for a local OpenAI-compatible server.
    pub fn local(model: impl Into<String>) -> Self {
        Self {
            api_key: "none".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            model: model.into(),
            timeout_secs: 30,
        }
    }

    /// Preset for a hosted OpenAI-compatible API.
    pub fn hosted(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            timeout_secs: 30,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// OpenAI-compatible `/chat/completions` client. Both the local and hosted
/// providers speak this shape; only the base URL and key differ.
pub struct OpenAiCompatClient {
    config: ClientConfig,
    provider: LlmProvider,
    http: Client,
}

// Wire types for /chat/completions
#[derive(Debug, Serialize)]
struct CompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<CompletionsChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionsChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiCompatClient {
    pub fn new(config: ClientConfig, provider: LlmProvider) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            config,
            provider,
            http,
        }
    }

    fn classify_http_error(&self, status: reqwest::StatusCode, body: &str) -> Error {
        let detail = serde_json::from_str::<ApiError>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());

        let message = match status.as_u16() {
            404 => format!("model '{}' not found: {}", self.config.model, detail),
            402 | 429 => format!("quota exceeded: {}", detail),
            _ => format!("HTTP {}: {}", status, detail),
        };

        Error::backend(self.provider.to_string(), message)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    ChatRole::System => "system".to_string(),
                    ChatRole::User => "user".to_string(),
                    ChatRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect();

        let api_request = CompletionsRequest {
            model: self.config.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::backend(self.provider.to_string(), "connection refused")
                } else if e.is_timeout() {
                    Error::timeout(self.config.timeout_secs * 1000)
                } else {
                    Error::backend(self.provider.to_string(), format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::backend(
                self.provider.to_string(),
                format!("failed to read response: {}", e),
            )
        })?;

        if !status.is_success() {
            return Err(self.classify_http_error(status, &body));
        }

        let api_response: CompletionsResponse = serde_json::from_str(&body).map_err(|e| {
            Error::backend(
                self.provider.to_string(),
                format!("failed to parse response: {}", e),
            )
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::backend(self.provider.to_string(), "no choices in response"))?;

        Ok(choice.message.content)
    }

    fn provider(&self) -> LlmProvider {
        self.provider
    }
}
