pub mod context;
pub mod loop_;
pub mod prompt_queue;
pub mod tool_parser;

pub use context::{ContextError, ContextManager};
pub use loop_::{AgentConfig, AgentCore, AgentError, CompletionRecord, CompletionReason, RunMode};
pub use prompt_queue::{Priority, PromptQueue, PromptQueueItem};
pub use tool_parser::{ParsedToolCall, parse_tool_calls};
