//! A deterministic, network-free provider used in tests and as the CLI's
//! default when no real provider is configured.
//!
//! Never emits tool calls; always finishes with `FinishReason::Stop`. Useful
//! for exercising the agent loop, prompt queue, and lifecycle machinery
//! without a live model.

use async_trait::async_trait;

use crate::ai::provider::{LLMProvider, ModelError};
use crate::ai::types::{CompletionRequest, CompletionResponse, FinishReason, Usage};

pub struct EchoProvider {
    context_limit: usize,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self { context_limit: 128_000 }
    }
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for EchoProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::ai::types::MessageRole::User))
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let content = format!("echo: {last_user}");
        let tokens = crate::ai::context::estimate_tokens(&content) as u32;

        Ok(CompletionResponse {
            content,
            tool_calls: Vec::new(),
            model: request.model,
            usage: Usage {
                prompt_tokens: crate::ai::context::estimate_total_tokens(&request.messages) as u32,
                completion_tokens: tokens,
                total_tokens: tokens,
            },
            finish_reason: FinishReason::Stop,
        })
    }

    fn context_limit(&self) -> usize {
        self.context_limit
    }

    fn supports_tools(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &str {
        "echo"
    }
}
