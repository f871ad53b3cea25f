//! Minimal OpenAI-compatible chat-completions provider.
//!
//! Gated behind the `http-provider` feature: the concrete wire protocol of
//! any given model vendor is out of scope here, so this is deliberately a
//! skeleton wide enough to hit an OpenAI-shaped `/chat/completions` endpoint
//! (OpenAI, OpenRouter, Ollama, any self-hosted gateway), not a full client
//! for every vendor's quirks.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::ai::provider::{LLMProvider, ModelError};
use crate::ai::types::{
    CompletionRequest, CompletionResponse, FinishReason, Message as AppMessage, MessageRole, Usage,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Connection details for an OpenAI-shaped chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub extra_headers: HashMap<String, String>,
    pub context_limit: usize,
}

impl OpenAiCompatibleConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            extra_headers: HashMap::new(),
            context_limit: 128_000,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_context_limit(mut self, context_limit: usize) -> Self {
        self.context_limit = context_limit;
        self
    }
}

pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
    provider_name: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig, provider_name: impl Into<String>) -> Result<Self, ModelError> {
        let provider_name = provider_name.into();
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Transport {
                provider: provider_name.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            provider_name,
        })
    }

    fn convert_message(msg: &AppMessage) -> ApiMessage {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::ToolResult => "tool",
        };
        ApiMessage {
            role: role.to_string(),
            content: msg.content.clone(),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn auth_header(&self) -> Option<String> {
        if self.config.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.config.api_key))
        }
    }

    async fn send_with_retry(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ModelError> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt - 1))).await;
            }

            let mut builder = self
                .client
                .post(format!("{}/chat/completions", self.config.base_url))
                .json(body);
            if let Some(auth) = self.auth_header() {
                builder = builder.header("Authorization", auth);
            }
            for (key, value) in &self.config.extra_headers {
                builder = builder.header(key, value);
            }

            match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(|e| ModelError::InvalidResponse {
                        provider: self.provider_name.clone(),
                        message: e.to_string(),
                    });
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    last_err = Some(ModelError::RateLimited {
                        provider: self.provider_name.clone(),
                        message: "429 Too Many Requests".to_string(),
                    });
                }
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(ModelError::InvalidRequest {
                        provider: self.provider_name.clone(),
                        message: format!("{status}: {body}"),
                    });
                }
                Ok(response) => {
                    last_err = Some(ModelError::Transport {
                        provider: self.provider_name.clone(),
                        message: format!("server error: {}", response.status()),
                    });
                }
                Err(e) if e.is_timeout() => {
                    last_err = Some(ModelError::Timeout {
                        provider: self.provider_name.clone(),
                    });
                }
                Err(e) => {
                    last_err = Some(ModelError::Transport {
                        provider: self.provider_name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(last_err.unwrap_or(ModelError::Transport {
            provider: self.provider_name.clone(),
            message: "request failed with no captured error".to_string(),
        }))
    }
}

#[async_trait]
impl LLMProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let api_request = self.build_request(&request);
        let api_response = self.send_with_retry(&api_request).await?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse {
                provider: self.provider_name.clone(),
                message: "no choices in response".to_string(),
            })?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: Vec::new(),
            model: api_response.model,
            usage: api_response
                .usage
                .map(|u| Usage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
            finish_reason,
        })
    }

    fn context_limit(&self) -> usize {
        self.config.context_limit
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_sets_header_and_limit() {
        let config = OpenAiCompatibleConfig::new("key", "https://api.example.com/v1")
            .with_header("X-Custom", "value")
            .with_context_limit(32_000);
        assert_eq!(config.extra_headers.get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(config.context_limit, 32_000);
    }

    #[test]
    fn message_conversion_maps_roles() {
        let api_msg = OpenAiCompatibleProvider::convert_message(&AppMessage::system("hi"));
        assert_eq!(api_msg.role, "system");
        let api_msg = OpenAiCompatibleProvider::convert_message(&AppMessage::tool_result("c1", "ok"));
        assert_eq!(api_msg.role, "tool");
    }

    #[test]
    fn provider_creation_succeeds() {
        let config = OpenAiCompatibleConfig::new("key", "https://api.example.com/v1");
        let provider = OpenAiCompatibleProvider::new(config, "example");
        assert!(provider.is_ok());
    }
}
