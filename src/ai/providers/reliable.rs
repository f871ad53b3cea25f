//! `RetryingModelClient` — retry-with-backoff and ordered-fallback wrapper
//! around any `LLMProvider`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::ai::provider::{LLMProvider, ModelError};
use crate::ai::types::{CompletionRequest, CompletionResponse};

/// Wraps a primary provider with exponential-backoff retries and an optional
/// ordered chain of fallback providers tried once retries on the primary are
/// exhausted.
pub struct RetryingModelClient {
    primary: Arc<dyn LLMProvider>,
    fallbacks: Vec<Arc<dyn LLMProvider>>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingModelClient {
    pub fn new(primary: Arc<dyn LLMProvider>) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn with_fallback(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.fallbacks.push(provider);
        self
    }

    /// Exponential backoff with up to 20% jitter, so retrying workers in a
    /// tournament stage don't all wake up on the same tick.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_frac = rand::thread_rng().gen_range(0.0..0.2);
        base + base.mul_f64(jitter_frac)
    }

    async fn try_provider(
        &self,
        provider: &Arc<dyn LLMProvider>,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ModelError> {
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }
            match provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.max_retries => continue,
                Err(err) => return Err(err),
            }
        }
        unreachable!("loop always returns on its last iteration")
    }
}

#[async_trait]
impl LLMProvider for RetryingModelClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let mut last_err = match self.try_provider(&self.primary, &request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        for fallback in &self.fallbacks {
            match self.try_provider(fallback, &request).await {
                Ok(response) => return Ok(response),
                Err(err) => last_err = err,
            }
        }

        Err(ModelError::AllProvidersFailed(Box::new(last_err)))
    }

    fn context_limit(&self) -> usize {
        self.fallbacks
            .iter()
            .map(|f| f.context_limit())
            .fold(self.primary.context_limit(), usize::min)
    }

    fn supports_tools(&self) -> bool {
        self.primary.supports_tools() && self.fallbacks.iter().all(|f| f.supports_tools())
    }

    fn provider_name(&self) -> &str {
        self.primary.provider_name()
    }

    async fn warmup(&self) -> Result<(), ModelError> {
        if let Err(err) = self.primary.warmup().await {
            tracing::warn!(provider = self.primary.provider_name(), %err, "warmup failed");
        }
        Ok(())
    }
}
