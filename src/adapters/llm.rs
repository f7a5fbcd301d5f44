use crate::domain::model::{ChatMessage, Completion, CompletionRequest, Usage};
use crate::domain::ports::CompletionClient;
use crate::utils::error::{ListingError, Result};
use crate::utils::text::preview;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "perplexity")]
    Perplexity,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::Perplexity => "https://api.perplexity.ai/chat/completions",
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Perplexity => "llama-3.1-sonar-huge-128k-online",
            Provider::OpenAi => "gpt-3.5-turbo",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Perplexity => "PERPLEXITY_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Perplexity => f.write_str("perplexity"),
            Provider::OpenAi => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    pub provider: Provider,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout: Duration,
}

impl ChatClientConfig {
    pub fn for_provider(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            endpoint: provider.default_endpoint().to_string(),
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            max_tokens: 1000,
            top_p: 0.9,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_citations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
}

/// OpenAI-compatible chat-completions client (Perplexity speaks the same dialect).
pub struct ChatClient {
    client: Client,
    config: ChatClientConfig,
}

impl ChatClient {
    pub fn new(config: ChatClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ChatClientConfig {
        &self.config
    }

    fn build_body<'a>(&'a self, request: &CompletionRequest) -> ChatRequestBody<'a> {
        let perplexity = self.config.provider == Provider::Perplexity;
        ChatRequestBody {
            model: &self.config.model,
            messages: request.messages(),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature,
            top_p: self.config.top_p,
            return_citations: perplexity.then_some(true),
            frequency_penalty: perplexity.then_some(1.0),
        }
    }
}

/// 從回應 JSON 取出 `choices[0].message.content` 及附帶資訊
pub fn parse_completion(raw: serde_json::Value) -> Result<Completion> {
    let content = raw
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ListingError::InvalidResponseError {
            message: "missing choices[0].message.content".to_string(),
        })?
        .trim()
        .to_string();

    if content.is_empty() {
        return Err(ListingError::InvalidResponseError {
            message: "completion content is empty".to_string(),
        });
    }

    let model = raw.get("model").and_then(|v| v.as_str()).map(str::to_string);
    let usage = raw
        .get("usage")
        .and_then(|v| serde_json::from_value::<Usage>(v.clone()).ok());
    let citations = raw
        .get("citations")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(Completion {
        content,
        model,
        usage,
        citations,
        raw,
    })
}

#[async_trait]
impl CompletionClient for ChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = self.build_body(request);
        tracing::debug!(
            "📡 Calling {} ({}) with temperature {}. Prompt: {}",
            self.config.provider,
            self.config.model,
            request.temperature,
            preview(&request.prompt, 100)
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("API request failed with status code: {}", status);
            return Err(ListingError::ApiStatusError {
                status: status.as_u16(),
                body: preview(&body, 500),
            });
        }

        let raw: serde_json::Value = response.json().await?;
        let completion = parse_completion(raw)?;

        if let Some(usage) = &completion.usage {
            tracing::debug!(
                "Token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        tracing::info!("💬 Completion received: {}", preview(&completion.content, 200));
        Ok(completion)
    }
}
