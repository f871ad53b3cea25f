use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::workspace::WorkspaceFs;

use super::traits::{Tool, ToolCategory, ToolResult};

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing required argument '{key}'"))
}

// ─── FileReadTool ────────────────────────────────────────────────────────────

pub struct FileReadTool {
    workspace: Arc<WorkspaceFs>,
}

impl FileReadTool {
    pub fn new(workspace: Arc<WorkspaceFs>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file relative to the workspace root."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the workspace root." },
                "max_lines": {
                    "type": "integer",
                    "description": "Maximum number of lines to return (default: all)."
                }
            },
            "required": ["path"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = required_str(&args, "path")?;
        let max_lines = args.get("max_lines").and_then(Value::as_u64).map(|n| n as usize);

        let contents = self
            .workspace
            .read_to_string(path)
            .map_err(|e| format!("failed to read '{path}': {e}"))?;

        let output = match max_lines {
            Some(n) => contents.lines().take(n).collect::<Vec<_>>().join("\n"),
            None => contents,
        };

        Ok(ToolResult::ok(output).with_metadata(json!({ "path": path })))
    }
}

// ─── FileWriteTool ───────────────────────────────────────────────────────────

pub struct FileWriteTool {
    workspace: Arc<WorkspaceFs>,
}

impl FileWriteTool {
    pub fn new(workspace: Arc<WorkspaceFs>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file relative to the workspace root, creating or overwriting it."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path":    { "type": "string", "description": "Path relative to the workspace root." },
                "content": { "type": "string", "description": "Content to write." }
            },
            "required": ["path", "content"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;

        self.workspace
            .write(path, content.as_bytes())
            .map_err(|e| format!("failed to write '{path}': {e}"))?;

        Ok(ToolResult::ok(format!("wrote {} bytes to '{path}'", content.len()))
            .with_metadata(json!({ "path": path, "bytes": content.len() })))
    }
}

// ─── FileListTool ────────────────────────────────────────────────────────────

pub struct FileListTool {
    workspace: Arc<WorkspaceFs>,
}

impl FileListTool {
    pub fn new(workspace: Arc<WorkspaceFs>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileListTool {
    fn name(&self) -> &str {
        "file_list"
    }

    fn description(&self) -> &str {
        "List files under a directory relative to the workspace root, recursively."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory relative to the workspace root." }
            },
            "required": ["path"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = required_str(&args, "path")?;

        let entries = self
            .workspace
            .list(path)
            .map_err(|e| format!("failed to list '{path}': {e}"))?;

        Ok(ToolResult::ok(entries.join("\n")).with_metadata(json!({ "count": entries.len() })))
    }
}

// ─── FileDeleteTool ──────────────────────────────────────────────────────────

pub struct FileDeleteTool {
    workspace: Arc<WorkspaceFs>,
}

impl FileDeleteTool {
    pub fn new(workspace: Arc<WorkspaceFs>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FileDeleteTool {
    fn name(&self) -> &str {
        "file_delete"
    }

    fn description(&self) -> &str {
        "Delete a file or directory relative to the workspace root."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the workspace root." }
            },
            "required": ["path"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = required_str(&args, "path")?;
        self.workspace
            .delete(path)
            .map_err(|e| format!("failed to delete '{path}': {e}"))?;
        Ok(ToolResult::ok(format!("deleted '{path}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Arc<WorkspaceFs> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(WorkspaceFs::new(dir.path()).unwrap())
    }

    #[tokio::test]
    async fn write_then_read() {
        let ws = workspace();
        FileWriteTool::new(ws.clone())
            .execute(json!({"path": "a.txt", "content": "hello"}))
            .await
            .unwrap();
        let r = FileReadTool::new(ws).execute(json!({"path": "a.txt"})).await.unwrap();
        assert_eq!(r.output, "hello");
    }

    #[tokio::test]
    async fn read_respects_max_lines() {
        let ws = workspace();
        FileWriteTool::new(ws.clone())
            .execute(json!({"path": "lines.txt", "content": "a\nb\nc\nd"}))
            .await
            .unwrap();
        let r = FileReadTool::new(ws)
            .execute(json!({"path": "lines.txt", "max_lines": 2}))
            .await
            .unwrap();
        assert_eq!(r.output.lines().count(), 2);
    }

    #[tokio::test]
    async fn list_and_delete() {
        let ws = workspace();
        FileWriteTool::new(ws.clone())
            .execute(json!({"path": "sub/file.txt", "content": "x"}))
            .await
            .unwrap();

        let r = FileListTool::new(ws.clone()).execute(json!({"path": "."})).await.unwrap();
        assert!(r.output.contains("sub/file.txt"));

        FileDeleteTool::new(ws.clone())
            .execute(json!({"path": "sub/file.txt"}))
            .await
            .unwrap();
        assert!(!ws.exists("sub/file.txt"));
    }

    #[tokio::test]
    async fn read_missing_file_errors() {
        let ws = workspace();
        let r = FileReadTool::new(ws).execute(json!({"path": "missing.txt"})).await;
        assert!(r.is_err());
    }
}
