pub mod context;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{LLMProvider, ModelError};
pub use types::{
    CompletionRequest, CompletionResponse, FinishReason, Message, MessageRole, ToolCall,
    ToolSchema, Usage,
};
