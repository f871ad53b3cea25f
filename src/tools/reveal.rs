//! `reveal` — the tournament-only tool a worker calls to publish a file from
//! its own `WorkspaceFS` to downstream stages and debate peers.
//!
//! The tool itself only records the intent; `TournamentEngine` reads the
//! recorded reveals back out through the shared [`RevealLog`] after each
//! worker reaches a terminal state, rather than pushing artifacts somewhere
//! else synchronously. Re-revealing the same filename replaces the prior
//! entry, per the reveal semantics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::workspace::WorkspaceFs;

use super::traits::{Tool, ToolCategory, ToolResult};

/// A single artifact a worker has chosen to reveal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevealedArtifact {
    pub filename: String,
    pub description: String,
    pub content: String,
}

/// Per-worker log of revealed filenames, keyed by filename so a re-reveal
/// replaces rather than appends.
#[derive(Debug, Default)]
pub struct RevealLog {
    entries: Mutex<HashMap<String, RevealedArtifact>>,
}

impl RevealLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, artifact: RevealedArtifact) {
        self.entries.lock().insert(artifact.filename.clone(), artifact);
    }

    pub fn snapshot(&self) -> Vec<RevealedArtifact> {
        let mut values: Vec<_> = self.entries.lock().values().cloned().collect();
        values.sort_by(|a, b| a.filename.cmp(&b.filename));
        values
    }
}

pub struct RevealTool {
    workspace: Arc<WorkspaceFs>,
    log: Arc<RevealLog>,
}

impl RevealTool {
    pub fn new(workspace: Arc<WorkspaceFs>, log: Arc<RevealLog>) -> Self {
        Self { workspace, log }
    }
}

#[async_trait]
impl Tool for RevealTool {
    fn name(&self) -> &str {
        "reveal"
    }

    fn description(&self) -> &str {
        "Make a file in your workspace visible to downstream tournament stages and debate peers."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": { "type": "string", "description": "Path relative to the workspace root to reveal." },
                "description": { "type": "string", "description": "What this artifact is and why it matters." }
            },
            "required": ["filename", "description"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Output
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let filename = args
            .get("filename")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'filename'")?;
        let description = args
            .get("description")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'description'")?;

        let content = self
            .workspace
            .read_to_string(filename)
            .map_err(|e| format!("cannot reveal '{filename}': {e}"))?;

        self.log.record(RevealedArtifact {
            filename: filename.to_string(),
            description: description.to_string(),
            content,
        });

        Ok(ToolResult::ok(format!("revealed '{filename}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reveal_records_content_and_replaces_on_rereveal() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(WorkspaceFs::new(dir.path()).unwrap());
        ws.write("out.md", b"v1").unwrap();
        let log = RevealLog::new();
        let tool = RevealTool::new(ws.clone(), log.clone());

        tool.execute(json!({"filename": "out.md", "description": "draft"}))
            .await
            .unwrap();
        assert_eq!(log.snapshot()[0].content, "v1");

        ws.write("out.md", b"v2").unwrap();
        tool.execute(json!({"filename": "out.md", "description": "revised"}))
            .await
            .unwrap();
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].content, "v2");
        assert_eq!(snapshot[0].description, "revised");
    }

    #[tokio::test]
    async fn reveal_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(WorkspaceFs::new(dir.path()).unwrap());
        let tool = RevealTool::new(ws, RevealLog::new());
        let r = tool.execute(json!({"filename": "missing.md", "description": "x"})).await;
        assert!(r.is_err());
    }
}
