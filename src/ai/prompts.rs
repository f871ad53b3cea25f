//! Prompt templates used internally by the runtime, as opposed to prompts an
//! operator supplies through `PromptQueue`.

use super::types::Message;

/// System prompt sent to the summarizer model when `ContextManager::compact`
/// collapses a run of older messages into a single synthetic summary.
///
/// The five numbered points mirror what `Compact` is required to preserve so
/// a run can resume coherently after compaction.
pub const SUMMARIZER_SYSTEM_PROMPT: &str = "You are compacting an AI agent's conversation history. \
Summarize the messages below into a single concise passage. Preserve, in order: \
(1) the active goal, (2) identities and paths of any files created or modified, \
(3) pending todos, (4) recorded failures with their causes, (5) key decisions with rationale. \
Do not include turn-by-turn narration. Write the summary as a neutral third-person account.";

/// Build the summarizer request body: a system prompt plus the messages
/// being dropped, rendered as a single user turn.
pub fn build_summarizer_messages(dropped: &[Message]) -> Vec<Message> {
    let transcript = dropped
        .iter()
        .map(|m| format!("{:?}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        Message::system(SUMMARIZER_SYSTEM_PROMPT),
        Message::user(transcript),
    ]
}
