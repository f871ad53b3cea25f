use async_trait::async_trait;
use thiserror::Error;

use super::types::{CompletionRequest, CompletionResponse};

/// Failure modes surfaced by an `LLMProvider`.
///
/// Retryable variants are the ones `RetryingModelClient` will back off and
/// retry on; the rest are treated as permanent.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' rate limited: {message}")]
    RateLimited { provider: String, message: String },

    #[error("provider '{provider}' timed out")]
    Timeout { provider: String },

    #[error("provider '{provider}' transport error: {message}")]
    Transport { provider: String, message: String },

    #[error("provider '{provider}' returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("provider '{provider}' rejected the request: {message}")]
    InvalidRequest { provider: String, message: String },

    #[error("all configured providers failed; last error: {0}")]
    AllProvidersFailed(Box<ModelError>),
}

impl ModelError {
    /// Whether a retry/backoff attempt is worth making for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited { .. } | ModelError::Timeout { .. } | ModelError::Transport { .. }
        )
    }
}

/// A backend capable of turning a `CompletionRequest` into a `CompletionResponse`.
///
/// Implementations are expected to be cheap to clone/share (`Arc<dyn LLMProvider>`)
/// and safe to call concurrently from multiple tournament workers.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Complete a prompt and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError>;

    /// Context window size, in tokens, this provider's model supports.
    fn context_limit(&self) -> usize;

    /// Whether this provider supports function/tool calling.
    fn supports_tools(&self) -> bool;

    /// Provider name, used in log entries and error messages.
    fn provider_name(&self) -> &str;

    /// Pre-establish any connection/session state. Default no-op.
    async fn warmup(&self) -> Result<(), ModelError> {
        Ok(())
    }
}
