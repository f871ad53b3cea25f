use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a tool sits in the registry's access-control and listing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Built-in tools every agent needs (filesystem, control).
    Core,
    /// Tools that manipulate the agent's own runtime (context, lifecycle).
    Meta,
    /// Tools whose purpose is producing an artifact surfaced to a caller.
    Output,
    /// Tools registered dynamically at runtime.
    Custom,
}

/// The result of executing a [`Tool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Human-readable output, fed back into the conversation as a
    /// `tool_result` message.
    pub output: String,
    pub success: bool,
    /// Optional structured metadata for machine consumption.
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            metadata: None,
        }
    }

    pub fn err(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A capability the agent loop can invoke.
///
/// Implementations must be `Send + Sync` so they can be held in a shared
/// `Arc<dyn Tool>` registry and called concurrently by multiple tournament
/// workers.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable machine identifier (snake_case), e.g. `"file_read"`.
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the model's tool listing.
    fn description(&self) -> &str;

    /// JSON Schema object describing the tool's accepted parameters.
    fn parameters_schema(&self) -> Value;

    /// `true` for tools that cannot be deleted nor overwritten once
    /// registered (the builtins). Custom tools registered at runtime are not
    /// protected.
    fn protected(&self) -> bool {
        true
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    /// Execute with arguments already validated against `parameters_schema`
    /// by the registry.
    async fn execute(&self, args: Value) -> Result<ToolResult, String>;
}

/// Summary of a registered tool, suitable for inclusion in an LLM request's
/// tool listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub schema: Value,
    pub category: ToolCategory,
}
