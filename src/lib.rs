pub mod agent;
pub mod ai;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod status;
pub mod tools;
pub mod tournament;
pub mod workspace;

/// Convenience re-exports for the most commonly used traits and types across
/// the agentcore runtime.
///
/// ```rust
/// use agentcore::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ai::provider::{LLMProvider, ModelError};
    pub use crate::ai::types::{CompletionRequest, CompletionResponse, Message, MessageRole};

    pub use crate::tools::{Tool, ToolRegistry, ToolResult};

    pub use crate::agent::{AgentCore, AgentConfig, PromptQueue, PromptQueueItem};

    pub use crate::lifecycle::{LifecycleController, LifecycleState};

    pub use crate::status::{AgentStatus, StatusBus};

    pub use crate::logging::{EnhancedLogEntry, EnhancedLogger, LogCategory};

    pub use crate::config::RuntimeConfig;

    pub use crate::workspace::{WorkspaceError, WorkspaceFs};

    pub use crate::tournament::{Tournament, TournamentEngine};
}
