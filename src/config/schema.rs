use serde::{Deserialize, Serialize};

// ─── ModelConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier for the main agent loop.
    pub main: String,
    /// Model identifier used for context-compaction summarization.
    pub summarizer: String,
    /// Model identifier for tournament workers.
    pub worker: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            main: "anthropic/claude-sonnet-4-20250514".to_owned(),
            summarizer: "anthropic/claude-haiku-4-20250514".to_owned(),
            worker: "anthropic/claude-haiku-4-20250514".to_owned(),
        }
    }
}

// ─── ContextConfig ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum estimated tokens the context window may hold before a turn.
    pub max_tokens: usize,
    /// Usage fraction at or above which `ShouldCompact()` returns true.
    pub compaction_threshold: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 128_000,
            compaction_threshold: 0.8,
        }
    }
}

// ─── AgentRunConfig ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentRunConfig {
    /// Whether the `run_process` tool may be registered at all.
    pub enable_code_execution: bool,
    /// Default timeout for code execution tools, in seconds.
    pub code_timeout_seconds: u64,
    /// Maximum turns before a task-scoped run halts with `max_turns_exceeded`.
    pub max_turns: Option<usize>,
    /// Wall-clock timeout for a whole `AgentCore` run, in seconds.
    pub timeout_seconds: Option<u64>,
}

impl Default for AgentRunConfig {
    fn default() -> Self {
        Self {
            enable_code_execution: false,
            code_timeout_seconds: 30,
            max_turns: None,
            timeout_seconds: None,
        }
    }
}

// ─── TournamentConfig ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TournamentConfig {
    /// Default worker count per stage, strictly non-increasing.
    pub default_stages: Vec<usize>,
    /// Default number of debate rounds run within each stage.
    pub default_debate_rounds: u32,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            default_stages: vec![4, 2, 1],
            default_debate_rounds: 1,
        }
    }
}

// ─── SandboxConfig ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Parent directory for all `WorkspaceFs` roots.
    pub root: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: "./sandbox".to_owned(),
        }
    }
}

// ─── RuntimeConfig ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub model: ModelConfig,
    pub context: ContextConfig,
    pub agent: AgentRunConfig,
    pub tournament: TournamentConfig,
    pub sandbox: SandboxConfig,
}
