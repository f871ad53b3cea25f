//! Token-estimation heuristics shared by `agent::context::ContextManager` and
//! the tournament engine's stage-sizing logic.
//!
//! These are free functions, not a stateful manager: the stateful piece that
//! tracks a running conversation's usage and decides when to compact lives in
//! `agent::context`.

use super::types::{Message, MessageRole};

/// Rough token estimate for a chunk of text: ~4 characters per token.
///
/// Not a real tokenizer. Good enough to drive compaction thresholds; never
/// assume it matches a provider's own accounting precisely.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

/// Fixed per-message overhead added to its content's estimated tokens,
/// covering the role marker and message framing most chat wire formats add.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimated tokens for a single message, including framing overhead.
pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

/// Estimated tokens for an entire message list.
pub fn estimate_total_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Split a message list into its leading system messages and everything else.
///
/// `ContextManager::compact` uses this to keep the system prompt untouched
/// while summarizing the conversation tail.
pub fn partition_system_messages(messages: &[Message]) -> (Vec<Message>, Vec<Message>) {
    messages
        .iter()
        .cloned()
        .partition(|m| matches!(m.role, MessageRole::System))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_tokens_rough_ratio() {
        let tokens = estimate_tokens("Hello, world!");
        assert!((3..=4).contains(&tokens));
    }

    #[test]
    fn partition_keeps_system_messages_separate() {
        let messages = vec![
            Message::system("you are helpful"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let (system, rest) = partition_system_messages(&messages);
        assert_eq!(system.len(), 1);
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn estimate_total_tokens_sums_messages() {
        let messages = vec![Message::user("hi"), Message::assistant("hello there")];
        let total = estimate_total_tokens(&messages);
        assert_eq!(
            total,
            estimate_message_tokens(&messages[0]) + estimate_message_tokens(&messages[1])
        );
    }
}
