//! The two reserved control tools named in the tool registry contract.
//!
//! Both are registered like ordinary tools (so they appear in the model's
//! tool listing and go through the same schema validation), but `AgentCore`
//! intercepts calls to them before dispatch: `complete_task` never reaches
//! `Tool::execute` in the loop (its arguments are read directly to build the
//! completion record), and `manage_context` routes into the owning
//! `ContextManager` rather than a registry-held handler. Both still carry a
//! working `execute` so a direct `ToolRegistry::invoke` call (e.g. from a
//! test) behaves sensibly.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::traits::{Tool, ToolCategory, ToolResult};

pub struct CompleteTaskTool;

#[async_trait]
impl Tool for CompleteTaskTool {
    fn name(&self) -> &str {
        super::registry::COMPLETE_TASK
    }

    fn description(&self) -> &str {
        "Signal that the current task is finished. The sole authority that ends a task-scoped run."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reason": {
                    "type": "string",
                    "enum": ["finished", "stuck", "blocked", "error"],
                    "description": "Why the task is ending."
                },
                "summary": { "type": "string", "description": "Summary of what was accomplished." },
                "output": { "type": "string", "description": "Optional final output artifact." }
            },
            "required": ["reason", "summary"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Meta
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let summary = args
            .get("summary")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'summary'")?;
        Ok(ToolResult::ok(format!("task completed: {summary}")))
    }
}

pub struct ManageContextTool;

#[async_trait]
impl Tool for ManageContextTool {
    fn name(&self) -> &str {
        super::registry::MANAGE_CONTEXT
    }

    fn description(&self) -> &str {
        "Inspect or control the agent's context window: report usage, force compaction, or set the compaction threshold."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["usage", "force_compact", "set_threshold"],
                    "description": "Which context operation to perform."
                },
                "threshold": {
                    "type": "number",
                    "description": "New compaction threshold in (0.1, 0.99]; required for 'set_threshold'."
                }
            },
            "required": ["action"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Meta
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let action = args
            .get("action")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'action'")?;
        Ok(ToolResult::ok(format!(
            "manage_context action '{action}' must be intercepted by AgentCore, not dispatched directly"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_task_requires_summary() {
        let tool = CompleteTaskTool;
        let r = tool.execute(json!({"reason": "done"})).await;
        assert!(r.is_err());
    }

    #[tokio::test]
    async fn complete_task_ok_with_summary() {
        let tool = CompleteTaskTool;
        let r = tool
            .execute(json!({"reason": "done", "summary": "finished the thing"}))
            .await
            .unwrap();
        assert!(r.success);
    }
}
