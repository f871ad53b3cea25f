//! Run a subprocess inside the workspace, subject to a configured timeout.
//!
//! Only registered when `agent.enable_code_execution` is set — see
//! `config::schema::AgentRunConfig`. The sole execution tool; there is no
//! sandboxing beyond the working directory and timeout, since a concrete
//! sandbox policy is out of scope here.

use std::path::PathBuf;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::workspace::WorkspaceFs;

use super::traits::{Tool, ToolCategory, ToolResult};

pub struct RunProcessTool {
    workspace: Arc<WorkspaceFs>,
    default_timeout: Duration,
}

impl RunProcessTool {
    pub fn new(workspace: Arc<WorkspaceFs>, default_timeout_seconds: u64) -> Self {
        Self {
            workspace,
            default_timeout: Duration::from_secs(default_timeout_seconds),
        }
    }
}

#[async_trait]
impl Tool for RunProcessTool {
    fn name(&self) -> &str {
        "run_process"
    }

    fn description(&self) -> &str {
        "Run a shell command with the workspace root as its working directory, subject to a timeout."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Shell command to run." },
                "timeout_seconds": {
                    "type": "integer",
                    "description": "Override the default execution timeout, in seconds."
                }
            },
            "required": ["command"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Core
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or("missing required argument 'command'")?;
        let timeout = args
            .get("timeout_seconds")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let cwd: PathBuf = self.workspace.root().to_path_buf();

        let mut command_builder = tokio::process::Command::new("sh");
        command_builder.arg("-c").arg(command).current_dir(&cwd).kill_on_drop(true);
        // Put the child in its own process group so a timeout can kill the
        // whole tree (background jobs, subshells, pipeline stages) instead
        // of just the `sh` leader.
        #[cfg(unix)]
        command_builder.process_group(0);

        let mut child = match command_builder.spawn() {
            Ok(child) => child,
            Err(e) => return Err(format!("failed to spawn command: {e}")),
        };
        let child_pid = child.id();

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("failed to run command: {e}")),
            Err(_) => {
                kill_process_group(child_pid);
                return Ok(ToolResult::err(format!(
                    "command timed out after {} seconds",
                    timeout.as_secs()
                ))
                .with_metadata(json!({ "timed_out": true })));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code();

        let combined = if stderr.is_empty() {
            stdout.clone()
        } else {
            format!("{stdout}\n--- stderr ---\n{stderr}")
        };

        let metadata = json!({ "exit_code": exit_code, "timed_out": false });
        if output.status.success() {
            Ok(ToolResult::ok(combined).with_metadata(metadata))
        } else {
            Ok(ToolResult::err(combined).with_metadata(metadata))
        }
    }
}

/// Send SIGKILL to the negated pid, i.e. the whole process group `spawn`
/// rooted via `process_group(0)`. A no-op if the child never reported a pid
/// (already reaped) or on non-unix targets, where the group was never formed.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Arc<WorkspaceFs> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(WorkspaceFs::new(dir.path()).unwrap())
    }

    #[tokio::test]
    async fn runs_successful_command() {
        let tool = RunProcessTool::new(workspace(), 5);
        let r = tool.execute(json!({"command": "echo hi"})).await.unwrap();
        assert!(r.success);
        assert!(r.output.contains("hi"));
    }

    #[tokio::test]
    async fn reports_nonzero_exit_as_failure() {
        let tool = RunProcessTool::new(workspace(), 5);
        let r = tool.execute(json!({"command": "exit 1"})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn times_out_long_running_command() {
        let tool = RunProcessTool::new(workspace(), 1);
        let r = tool
            .execute(json!({"command": "sleep 5", "timeout_seconds": 1}))
            .await
            .unwrap();
        assert!(!r.success);
        assert_eq!(r.metadata.unwrap()["timed_out"], true);
    }

    #[tokio::test]
    async fn kills_background_descendant_on_timeout() {
        let ws = workspace();
        let tool = RunProcessTool::new(ws.clone(), 1);
        let r = tool
            .execute(json!({
                "command": "(sleep 5 && touch descendant_ran) & wait",
                "timeout_seconds": 1
            }))
            .await
            .unwrap();
        assert!(!r.success);
        assert_eq!(r.metadata.unwrap()["timed_out"], true);

        // If the backgrounded `sleep 5 && touch` survived the timeout, it
        // would create the marker file well before this check fires.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!ws.exists("descendant_ran"));
    }

    #[tokio::test]
    async fn missing_command_errors() {
        let tool = RunProcessTool::new(workspace(), 5);
        let r = tool.execute(json!({})).await;
        assert!(r.is_err());
    }
}
