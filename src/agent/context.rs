//! `ContextManager` — the stateful conversation window owned by a single
//! `AgentCore`.
//!
//! Built on top of `ai::context`'s token-estimation free functions and
//! `ai::prompts::build_summarizer_messages`; this is the piece that actually
//! owns a `Vec<Message>`, a running token estimate, and the compaction
//! threshold/count those functions don't track themselves.

use std::sync::Arc;

use thiserror::Error;

use crate::ai::context::{estimate_message_tokens, estimate_total_tokens, partition_system_messages};
use crate::ai::prompts::build_summarizer_messages;
use crate::ai::provider::{LLMProvider, ModelError};
use crate::ai::types::{CompletionRequest, Message};

/// Number of trailing messages `compact` always keeps verbatim, regardless
/// of the threshold that triggered compaction.
pub const DEFAULT_MIN_RECENT_MESSAGES: usize = 4;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("compaction threshold must be in [0.1, 0.99], got {0}")]
    RangeError(f64),
    #[error("compaction failed: {0}")]
    CompactionFailed(ModelError),
}

/// Owns one agent's message history and decides when it needs summarizing.
pub struct ContextManager {
    messages: Vec<Message>,
    estimated_tokens: usize,
    max_tokens: usize,
    threshold: f64,
    compaction_count: u64,
    min_recent_messages: usize,
    summarizer: Arc<dyn LLMProvider>,
    summarizer_model: String,
}

impl ContextManager {
    pub fn new(max_tokens: usize, threshold: f64, summarizer: Arc<dyn LLMProvider>, summarizer_model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            estimated_tokens: 0,
            max_tokens,
            threshold,
            compaction_count: 0,
            min_recent_messages: DEFAULT_MIN_RECENT_MESSAGES,
            summarizer,
            summarizer_model: summarizer_model.into(),
        }
    }

    pub fn with_min_recent_messages(mut self, floor: usize) -> Self {
        self.min_recent_messages = floor;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn compaction_count(&self) -> u64 {
        self.compaction_count
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    /// Append a message and update the running token estimate.
    pub fn append(&mut self, message: Message) {
        self.estimated_tokens += estimate_message_tokens(&message);
        self.messages.push(message);
    }

    pub fn usage_percent(&self) -> f64 {
        if self.max_tokens == 0 {
            return 1.0;
        }
        self.estimated_tokens as f64 / self.max_tokens as f64
    }

    pub fn should_compact(&self) -> bool {
        self.usage_percent() >= self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<(), ContextError> {
        if !(0.1..=0.99).contains(&threshold) {
            return Err(ContextError::RangeError(threshold));
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Summarize older messages into a single synthetic system message,
    /// preserving the active goal, file identities, pending todos, recorded
    /// failures, and key decisions — plus the trailing `min_recent_messages`
    /// verbatim.
    ///
    /// On failure the context is left byte-identical to its pre-call state.
    pub async fn compact(&mut self) -> Result<(), ContextError> {
        let (system_prefix, rest) = partition_system_messages(&self.messages);

        if rest.len() <= self.min_recent_messages {
            return Ok(());
        }

        let split = rest.len() - self.min_recent_messages;
        let dropped = &rest[..split];
        let tail = &rest[split..];

        let summary = self
            .summarizer
            .complete(CompletionRequest::new(
                self.summarizer_model.clone(),
                build_summarizer_messages(dropped),
            ))
            .await
            .map_err(ContextError::CompactionFailed)?;

        let mut rebuilt = system_prefix;
        rebuilt.push(Message::system(summary.content));
        rebuilt.extend_from_slice(tail);

        self.messages = rebuilt;
        self.estimated_tokens = estimate_total_tokens(&self.messages);
        self.compaction_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{CompletionResponse, FinishReason, Usage};
    use async_trait::async_trait;

    struct StubSummarizer {
        result: Result<String, ()>,
    }

    #[async_trait]
    impl LLMProvider for StubSummarizer {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
            match &self.result {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    tool_calls: Vec::new(),
                    model: "stub-summarizer".to_string(),
                    usage: Usage::default(),
                    finish_reason: FinishReason::Stop,
                }),
                Err(()) => Err(ModelError::Transport {
                    provider: "stub".to_string(),
                    message: "summarizer down".to_string(),
                }),
            }
        }
        fn context_limit(&self) -> usize {
            4096
        }
        fn supports_tools(&self) -> bool {
            false
        }
        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    fn manager(result: Result<&str, ()>) -> ContextManager {
        let summarizer: Arc<dyn LLMProvider> = Arc::new(StubSummarizer {
            result: result.map(str::to_string),
        });
        ContextManager::new(1000, 0.5, summarizer, "summarizer-model").with_min_recent_messages(2)
    }

    #[test]
    fn append_monotonically_increases_estimate() {
        let mut ctx = manager(Ok("summary"));
        let before = ctx.estimated_tokens();
        ctx.append(Message::user("hello there, this is a message"));
        assert!(ctx.estimated_tokens() > before);
    }

    #[test]
    fn should_compact_crosses_threshold() {
        let mut ctx = manager(Ok("summary"));
        assert!(!ctx.should_compact());
        ctx.append(Message::user("x".repeat(3000)));
        assert!(ctx.should_compact());
    }

    #[test]
    fn set_threshold_rejects_out_of_range() {
        let mut ctx = manager(Ok("summary"));
        assert!(ctx.set_threshold(0.05).is_err());
        assert!(ctx.set_threshold(1.0).is_err());
        assert!(ctx.set_threshold(0.6).is_ok());
    }

    #[tokio::test]
    async fn compact_preserves_goal_text_and_tail() {
        let mut ctx = manager(Ok("summary mentions reach the stated goal"));
        ctx.append(Message::system("persona"));
        ctx.append(Message::user("goal: reach the stated goal"));
        ctx.append(Message::assistant("working on it"));
        ctx.append(Message::user("turn 2"));
        ctx.append(Message::assistant("turn 2 reply"));
        ctx.append(Message::user("turn 3"));

        ctx.compact().await.unwrap();

        assert_eq!(ctx.compaction_count(), 1);
        let summary_msg = ctx.messages().iter().find(|m| m.content.contains("stated goal"));
        assert!(summary_msg.is_some());
        assert_eq!(ctx.messages().last().unwrap().content, "turn 3");
    }

    #[tokio::test]
    async fn compact_failure_leaves_context_untouched() {
        let mut ctx = manager(Err(()));
        ctx.append(Message::user("a"));
        ctx.append(Message::assistant("b"));
        ctx.append(Message::user("c"));
        ctx.append(Message::assistant("d"));
        ctx.append(Message::user("e"));

        let before = ctx.messages().to_vec();
        let before_tokens = ctx.estimated_tokens();

        let result = ctx.compact().await;
        assert!(result.is_err());
        assert_eq!(ctx.messages(), before.as_slice());
        assert_eq!(ctx.estimated_tokens(), before_tokens);
        assert_eq!(ctx.compaction_count(), 0);
    }

    #[tokio::test]
    async fn compact_no_op_when_under_recent_floor() {
        let mut ctx = manager(Ok("summary"));
        ctx.append(Message::user("a"));
        ctx.append(Message::assistant("b"));

        ctx.compact().await.unwrap();
        assert_eq!(ctx.compaction_count(), 0);
    }
}
