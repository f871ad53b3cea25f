//! Apply unified diff patches to a file inside the workspace.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::workspace::WorkspaceFs;

use super::traits::{Tool, ToolCategory, ToolResult};

pub struct PatchTool {
    workspace: Arc<WorkspaceFs>,
}

impl PatchTool {
    pub fn new(workspace: Arc<WorkspaceFs>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for PatchTool {
    fn name(&self) -> &str {
        "patch"
    }

    fn description(&self) -> &str {
        "Apply a unified diff to a file relative to the workspace root. \
         Reports a conflict instead of erroring when the patch does not apply cleanly."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the workspace root." },
                "diff": { "type": "string", "description": "Unified diff content to apply." },
                "dry_run": {
                    "type": "boolean",
                    "description": "If true, validate without writing (default: false)."
                }
            },
            "required": ["path", "diff"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'path'")?;
        let diff_content = args
            .get("diff")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'diff'")?;
        let dry_run = args.get("dry_run").and_then(Value::as_bool).unwrap_or(false);

        let original = self
            .workspace
            .read_to_string(path)
            .map_err(|e| format!("failed to read '{path}': {e}"))?;

        let patch = diffy::Patch::from_str(diff_content).map_err(|e| format!("failed to parse diff: {e}"))?;

        match diffy::apply(&original, &patch) {
            Ok(patched) => {
                if dry_run {
                    return Ok(ToolResult::ok(format!("patch would apply cleanly to '{path}' (dry run)"))
                        .with_metadata(json!({ "path": path, "dry_run": true, "conflicts": false })));
                }
                self.workspace
                    .write(path, patched.as_bytes())
                    .map_err(|e| format!("failed to write '{path}': {e}"))?;
                Ok(ToolResult::ok(format!("patch applied to '{path}'"))
                    .with_metadata(json!({ "path": path, "conflicts": false })))
            }
            Err(e) => Ok(ToolResult::err(format!("patch conflict in '{path}': {e}"))
                .with_metadata(json!({ "path": path, "conflicts": true }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace_with(path: &str, content: &str) -> Arc<WorkspaceFs> {
        let dir = tempfile::tempdir().unwrap();
        let ws = WorkspaceFs::new(dir.path()).unwrap();
        ws.write(path, content.as_bytes()).unwrap();
        Arc::new(ws)
    }

    #[tokio::test]
    async fn applies_clean_patch() {
        let ws = workspace_with("test.txt", "hello world\n");
        let diff = "--- test.txt\n+++ test.txt\n@@ -1 +1 @@\n-hello world\n+hello universe\n";
        let tool = PatchTool::new(ws.clone());
        let r = tool.execute(json!({"path": "test.txt", "diff": diff})).await.unwrap();
        assert!(r.success);
        assert_eq!(ws.read_to_string("test.txt").unwrap(), "hello universe\n");
    }

    #[tokio::test]
    async fn dry_run_does_not_modify() {
        let ws = workspace_with("test.txt", "original\n");
        let diff = "--- test.txt\n+++ test.txt\n@@ -1 +1 @@\n-original\n+modified\n";
        let tool = PatchTool::new(ws.clone());
        let r = tool
            .execute(json!({"path": "test.txt", "diff": diff, "dry_run": true}))
            .await
            .unwrap();
        assert!(r.success);
        assert_eq!(ws.read_to_string("test.txt").unwrap(), "original\n");
    }

    #[tokio::test]
    async fn conflict_is_reported_not_errored() {
        let ws = workspace_with("test.txt", "different content\n");
        let diff = "--- test.txt\n+++ test.txt\n@@ -1 +1 @@\n-hello world\n+hello universe\n";
        let tool = PatchTool::new(ws);
        let r = tool.execute(json!({"path": "test.txt", "diff": diff})).await.unwrap();
        assert!(!r.success);
        assert!(r.output.contains("conflict"));
    }
}
