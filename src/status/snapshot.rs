//! `AgentStatus` — the observability-plane snapshot of a running `AgentCore`.

use serde::{Deserialize, Serialize};

use crate::agent::prompt_queue::PromptQueueItem;

/// The `AgentCore` state machine's states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Running,
    Paused,
    Stopping,
    Stopped,
    Error,
}

/// A point-in-time snapshot of an `AgentCore`, rebuilt on any meaningful
/// change and published to `StatusBus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub state: AgentState,
    pub loop_count: u64,
    pub total_tokens: u64,
    pub last_action: String,
    pub context_usage_percent: f64,
    pub queued_prompts: Vec<PromptQueueItem>,
    /// Opaque digest of the agent's current todo list; this runtime does not
    /// interpret todo content, only carries it through for display.
    pub todos_digest: Option<String>,
}

impl AgentStatus {
    pub fn initial() -> Self {
        Self {
            state: AgentState::Idle,
            loop_count: 0,
            total_tokens: 0,
            last_action: "idle".to_string(),
            context_usage_percent: 0.0,
            queued_prompts: Vec::new(),
            todos_digest: None,
        }
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::initial()
    }
}
