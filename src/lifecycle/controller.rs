//! `LifecycleController` — mediates external start/stop/restart/factory-reset
//! commands onto a single `AgentCore`, serializing them against each other.
//!
//! Narrowed from the teacher's `lifecycle/states.rs` `ResourceState`/
//! `ResourceId` machinery (which spans many heterogeneous resource types —
//! channels, scheduler jobs, subagents) down to the single `AgentCore` state
//! machine this runtime defines; naming and serde conventions are kept, the
//! multi-resource generality is not.

use std::path::Path;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::agent::{AgentCore, AgentError, CompletionRecord};
use crate::status::AgentState;
use crate::workspace::WorkspaceError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("factory reset requires explicit confirmation")]
    FactoryResetWithoutConfirm,
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("building backup archive failed: {0}")]
    Archive(#[from] std::io::Error),
}

#[derive(Debug, Default)]
pub struct FactoryResetOutcome {
    pub archive_bytes: Option<Vec<u8>>,
}

type RunHandle = JoinHandle<Result<Option<CompletionRecord>, AgentError>>;

/// Owns the single background task driving `AgentCore::run`, and a command
/// lock so two concurrent external commands (e.g. two `Stop`s racing a
/// `Restart`) cannot interleave.
pub struct LifecycleController {
    agent: Arc<AgentCore>,
    command_lock: AsyncMutex<()>,
    run_handle: AsyncMutex<Option<RunHandle>>,
}

impl LifecycleController {
    pub fn new(agent: Arc<AgentCore>) -> Self {
        Self {
            agent,
            command_lock: AsyncMutex::new(()),
            run_handle: AsyncMutex::new(None),
        }
    }

    pub fn state(&self) -> AgentState {
        self.agent.state()
    }

    pub fn agent(&self) -> &Arc<AgentCore> {
        &self.agent
    }

    /// `Start(goal?)`. A no-op if already running.
    pub async fn start(&self, goal: Option<String>) -> Result<(), LifecycleError> {
        let _guard = self.command_lock.lock().await;
        if self.agent.state() == AgentState::Running {
            return Ok(());
        }
        self.agent.start(goal).await?;
        self.spawn_run().await;
        Ok(())
    }

    pub fn pause(&self) -> Result<(), LifecycleError> {
        Ok(self.agent.pause()?)
    }

    pub fn resume(&self) -> Result<(), LifecycleError> {
        Ok(self.agent.resume()?)
    }

    /// `Stop()`. A no-op if already stopped or never started.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let _guard = self.command_lock.lock().await;
        if matches!(self.agent.state(), AgentState::Idle | AgentState::Stopped) {
            return Ok(());
        }
        self.agent.stop();
        self.join_run().await;
        Ok(())
    }

    /// `Restart({prompt?, keep_context})`: atomic stop+start.
    pub async fn restart(&self, prompt: Option<String>, keep_context: bool) -> Result<(), LifecycleError> {
        let _guard = self.command_lock.lock().await;
        self.agent.restart(prompt, keep_context).await?;
        self.join_run().await;
        self.spawn_run().await;
        Ok(())
    }

    pub async fn force_compact(&self) -> Result<(), LifecycleError> {
        Ok(self.agent.force_compact().await?)
    }

    /// `FactoryReset({confirm, backup})`. Refuses without `confirm`. Stops
    /// the agent if running, optionally archives the workspace, purges it,
    /// then clears agent state back to `idle`.
    pub async fn factory_reset(&self, confirm: bool, backup: bool) -> Result<FactoryResetOutcome, LifecycleError> {
        if !confirm {
            return Err(LifecycleError::FactoryResetWithoutConfirm);
        }

        let _guard = self.command_lock.lock().await;
        if !matches!(self.agent.state(), AgentState::Idle | AgentState::Stopped) {
            self.agent.stop();
            self.join_run().await;
        }

        let archive_bytes = if backup {
            Some(build_backup_archive(self.agent.workspace().root())?)
        } else {
            None
        };

        for path in self.agent.workspace().list(".")? {
            self.agent.workspace().delete(&path)?;
        }

        self.agent.reset_to_idle().await;

        Ok(FactoryResetOutcome { archive_bytes })
    }

    async fn spawn_run(&self) {
        let agent = self.agent.clone();
        let handle = tokio::spawn(async move { agent.run().await });
        *self.run_handle.lock().await = Some(handle);
    }

    async fn join_run(&self) {
        if let Some(handle) = self.run_handle.lock().await.take() {
            let _ = handle.await;
        }
    }
}

/// Stream `root` into a `.tar.gz` byte buffer. Mirrors, on the write side,
/// the hardened read-side discipline of never trusting a path without
/// re-validating it against the root right before the syscall — here that
/// means archiving only through `WorkspaceFs`'s own canonicalized root.
fn build_backup_archive(root: &Path) -> Result<Vec<u8>, std::io::Error> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", root)?;
    let encoder = builder.into_inner()?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, Priority, PromptQueue, RunMode};
    use crate::ai::providers::echo::EchoProvider;
    use crate::logging::EnhancedLogger;
    use crate::status::StatusBus;
    use crate::tools::ToolRegistry;
    use crate::workspace::WorkspaceFs;

    fn controller() -> (LifecycleController, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Arc::new(WorkspaceFs::new(dir.path()).unwrap());
        let agent = Arc::new(AgentCore::new(
            AgentConfig {
                run_mode: RunMode::Continuous,
                ..Default::default()
            },
            Arc::new(EchoProvider::default()),
            Arc::new(EchoProvider::default()),
            Arc::new(ToolRegistry::new()),
            workspace,
            Arc::new(PromptQueue::new()),
            Arc::new(StatusBus::default()),
            EnhancedLogger::new(100),
        ));
        (LifecycleController::new(agent), dir)
    }

    #[tokio::test]
    async fn start_then_start_again_is_noop() {
        let (controller, _dir) = controller();
        controller.start(Some("goal".to_string())).await.unwrap();
        assert_eq!(controller.state(), AgentState::Running);
        controller.start(Some("another goal".to_string())).await.unwrap();
        assert_eq!(controller.state(), AgentState::Running);
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_while_stopped_is_noop() {
        let (controller, _dir) = controller();
        controller.stop().await.unwrap();
        assert_eq!(controller.state(), AgentState::Idle);
    }

    #[tokio::test]
    async fn factory_reset_without_confirm_is_rejected() {
        let (controller, _dir) = controller();
        let err = controller.factory_reset(false, false).await.unwrap_err();
        assert!(matches!(err, LifecycleError::FactoryResetWithoutConfirm));
    }

    #[tokio::test]
    async fn factory_reset_with_backup_produces_archive_and_returns_to_idle() {
        let (controller, _dir) = controller();
        controller.agent().workspace().write("note.txt", b"hello").unwrap();

        controller.start(Some("goal".to_string())).await.unwrap();
        let outcome = controller.factory_reset(true, true).await.unwrap();

        assert!(outcome.archive_bytes.is_some());
        assert!(!outcome.archive_bytes.unwrap().is_empty());
        assert_eq!(controller.state(), AgentState::Idle);
        assert!(!controller.agent().workspace().exists("note.txt"));
    }

    #[tokio::test]
    async fn factory_reset_without_backup_has_no_archive() {
        let (controller, _dir) = controller();
        let outcome = controller.factory_reset(true, false).await.unwrap();
        assert!(outcome.archive_bytes.is_none());
    }

    #[tokio::test]
    async fn enqueue_is_visible_via_agent_queue() {
        let (controller, _dir) = controller();
        let id = controller.agent().queue().enqueue("hello", Priority::High);
        assert_eq!(controller.agent().queue().len(), 1);
        assert!(controller.agent().queue().remove(&id));
    }
}
