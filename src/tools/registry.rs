use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::profiles::ToolProfile;
use super::schema::{self, SchemaViolation};
use super::traits::{Tool, ToolInfo};

/// Name of the reserved tool that signals task completion (see `AgentCore`).
pub const COMPLETE_TASK: &str = "complete_task";
/// Name of the reserved tool that routes into `ContextManager`.
pub const MANAGE_CONTEXT: &str = "manage_context";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("schema violation for tool '{tool}': {violation}")]
    SchemaViolation { tool: String, violation: SchemaViolation },
    #[error("tool '{tool}' handler failed: {message}")]
    HandlerFailure { tool: String, message: String },
    #[error("cannot overwrite or delete protected tool '{0}'")]
    PolicyViolation(String),
}

/// Central registry of available tools.
///
/// Registration happens during startup; once the startup phase closes, the
/// registry is treated as shared read-only and wrapped in `Arc`. Dynamic
/// (`custom`) tool registration after that point goes through
/// `register_custom`, which still serializes under the registry's own
/// `&mut self` borrow.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a builtin/protected tool. Panics only via `register_custom`'s
    /// policy check — this path is for startup wiring and trusts the caller.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Register a tool at runtime, honoring the protected-tool invariant:
    /// an existing protected tool cannot be overwritten.
    pub fn register_custom(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if let Some(existing) = self.tools.get(tool.name()) {
            if existing.protected() {
                return Err(ToolError::PolicyViolation(tool.name().to_string()));
            }
        }
        self.tools.insert(tool.name().to_string(), tool);
        Ok(())
    }

    /// Remove a tool by name. Protected tools cannot be deleted.
    pub fn unregister(&mut self, name: &str) -> Result<(), ToolError> {
        match self.tools.get(name) {
            Some(tool) if tool.protected() => Err(ToolError::PolicyViolation(name.to_string())),
            Some(_) => {
                self.tools.remove(name);
                Ok(())
            }
            None => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools.values().map(tool_info).collect()
    }

    /// List tools visible to a worker restricted to the given profile.
    pub fn list_filtered(&self, profile: ToolProfile) -> Vec<ToolInfo> {
        self.tools
            .values()
            .filter(|t| profile.is_tool_allowed(t.name()))
            .map(tool_info)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `args` against the tool's schema and execute it.
    ///
    /// `tool_description` (the model's free-text rationale for the call) is
    /// stripped from `args` before dispatch; callers should surface it only
    /// via `EnhancedLogger`, never to the handler.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<super::traits::ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        schema::validate(&tool.parameters_schema(), &args).map_err(|violation| {
            ToolError::SchemaViolation {
                tool: name.to_string(),
                violation,
            }
        })?;

        tool.execute(args)
            .await
            .map_err(|message| ToolError::HandlerFailure {
                tool: name.to_string(),
                message,
            })
    }
}

fn tool_info(tool: &Arc<dyn Tool>) -> ToolInfo {
    ToolInfo {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        schema: tool.parameters_schema(),
        category: tool.category(),
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
