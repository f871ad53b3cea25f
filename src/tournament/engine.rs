//! `TournamentEngine` — spawns and supervises staged worker agents.
//!
//! Grounded in the teacher's `AgentOrchestrator::run_parallel_tasks`
//! (`agents/orchestrator.rs`) for the spawn/concurrency/collect shape and
//! `SubagentSpawner` (`agents/spawner.rs`) for per-worker lifecycle,
//! narrowed to spec.md's single failure strategy: a stage never fails fast,
//! it only fails when zero artifacts survive it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::{AgentConfig, AgentCore, CompletionRecord, PromptQueue, RunMode};
use crate::ai::provider::LLMProvider;
use crate::logging::{EnhancedLogEntry, EnhancedLogger, LogCategory};
use crate::status::StatusBus;
use crate::tools::profiles::ToolProfile;
use crate::tools::reveal::{RevealLog, RevealTool, RevealedArtifact};
use crate::tools::{control, file_ops, patch, process, ToolRegistry};
use crate::workspace::WorkspaceFs;

use super::types::{
    merge_revealed, validate_stages, StageRecord, Tournament, TournamentError, TournamentStatus, WorkerRecord,
};

/// One running worker: the `AgentCore` plus the bits `TournamentEngine`
/// reads back out of it once it reaches a terminal state.
struct WorkerHandle {
    id: String,
    agent: Arc<AgentCore>,
    workspace: Arc<WorkspaceFs>,
    reveal_log: Arc<RevealLog>,
}

/// Spawns staged, parallel worker `AgentCore`s, each in its own isolated
/// `WorkspaceFS`, and collects their revealed artifacts stage over stage.
pub struct TournamentEngine {
    worker_model: Arc<dyn LLMProvider>,
    summarizer: Arc<dyn LLMProvider>,
    worker_config: AgentConfig,
    code_timeout_seconds: u64,
    sandbox_root: PathBuf,
    logger: Arc<EnhancedLogger>,
    cancel: CancellationToken,
}

impl TournamentEngine {
    pub fn new(
        worker_model: Arc<dyn LLMProvider>,
        summarizer: Arc<dyn LLMProvider>,
        worker_config: AgentConfig,
        code_timeout_seconds: u64,
        sandbox_root: impl Into<PathBuf>,
        logger: Arc<EnhancedLogger>,
    ) -> Self {
        Self {
            worker_model,
            summarizer,
            // Every tournament worker is task-scoped and tool-restricted
            // regardless of what the caller's template config says; these
            // two fields are invariants of being a worker, not a choice.
            worker_config: AgentConfig {
                run_mode: RunMode::TaskScoped,
                tool_profile: ToolProfile::Worker,
                ..worker_config
            },
            code_timeout_seconds,
            sandbox_root: sandbox_root.into(),
            logger,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every in-flight worker across every stage.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn run(&self, topic: &str, stages: Vec<usize>, debate_rounds: usize) -> Result<Tournament, TournamentError> {
        validate_stages(&stages)?;

        let tournament_id = Uuid::new_v4().to_string();
        let mut tournament = Tournament::new(tournament_id.clone(), topic, stages.clone(), debate_rounds);
        tournament.status = TournamentStatus::Running;
        self.emit(format!("tournament {tournament_id} started: topic='{topic}' stages={stages:?}"));

        let mut predecessor: Vec<RevealedArtifact> = Vec::new();
        let mut pending_conflict_notes: Vec<String> = Vec::new();

        for (stage_index, &worker_count) in stages.iter().enumerate() {
            let mut debate_transcript = Vec::new();
            let workers = self
                .run_stage(&tournament_id, stage_index, worker_count, topic, &predecessor, debate_rounds, &mut debate_transcript)
                .await?;

            let all_revealed: Vec<RevealedArtifact> = workers.iter().flat_map(|w| w.revealed.clone()).collect();
            let (merged, notes) = merge_revealed(all_revealed);

            let stage_record = StageRecord {
                stage_index,
                workers,
                debate_transcript,
                conflict_notes: std::mem::take(&mut pending_conflict_notes),
                started_at: Utc::now(),
                ended_at: Some(Utc::now()),
            };
            self.emit(format!(
                "tournament {tournament_id} stage {stage_index} complete: {} artifact(s) survived",
                merged.len()
            ));
            tournament.stage_records.push(stage_record);
            tournament.current_stage_index = stage_index;

            if merged.is_empty() {
                tournament.status = TournamentStatus::Failed;
                return Err(TournamentError::AllWorkersFailed { stage: stage_index });
            }

            pending_conflict_notes = notes;
            predecessor = merged;
        }

        tournament.status = TournamentStatus::Complete;
        tournament.final_artifacts = Some(predecessor);
        self.emit(format!("tournament {tournament_id} complete"));
        Ok(tournament)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        &self,
        tournament_id: &str,
        stage_index: usize,
        worker_count: usize,
        topic: &str,
        predecessor: &[RevealedArtifact],
        debate_rounds: usize,
        debate_transcript: &mut Vec<String>,
    ) -> Result<Vec<WorkerRecord>, TournamentError> {
        let stage_cancel = self.cancel.child_token();
        let mut handles = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            handles.push(self.build_worker(tournament_id, stage_index, worker_index, predecessor, &stage_cancel)?);
        }

        let prompts: Vec<String> = handles.iter().map(|h| build_initial_prompt(&h.id, topic, predecessor)).collect();
        let mut completions = spawn_and_collect(&handles, prompts, false).await;

        for round in 0..debate_rounds {
            let snapshots: Vec<Vec<RevealedArtifact>> = handles.iter().map(|h| h.reveal_log.snapshot()).collect();
            let prompts: Vec<String> = (0..handles.len())
                .map(|idx| {
                    let peers = peer_reveal_set(&snapshots, idx);
                    debate_transcript.push(format!(
                        "stage {stage_index} round {round} worker {}: critiquing {} peer artifact(s)",
                        handles[idx].id,
                        peers.len()
                    ));
                    build_debate_prompt(round, &peers)
                })
                .collect();

            completions = spawn_and_collect(&handles, prompts, true).await;
        }

        let mut workers = Vec::with_capacity(handles.len());
        for (handle, completion) in handles.into_iter().zip(completions) {
            workers.push(WorkerRecord {
                id: handle.id,
                tournament_id: tournament_id.to_string(),
                stage_index,
                workspace_path: handle.workspace.root().to_path_buf(),
                state: handle.agent.state(),
                revealed: handle.reveal_log.snapshot(),
                completion,
            });
        }
        Ok(workers)
    }

    fn build_worker(
        &self,
        tournament_id: &str,
        stage_index: usize,
        worker_index: usize,
        predecessor: &[RevealedArtifact],
        stage_cancel: &CancellationToken,
    ) -> Result<WorkerHandle, TournamentError> {
        let worker_id = format!("{tournament_id}-s{stage_index}-w{worker_index}");
        let workspace = Arc::new(WorkspaceFs::new_isolated(&self.sandbox_root)?);

        for artifact in predecessor {
            workspace.write(&artifact.filename, artifact.content.as_bytes())?;
        }

        let reveal_log = RevealLog::new();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(file_ops::FileReadTool::new(workspace.clone())));
        registry.register(Arc::new(file_ops::FileWriteTool::new(workspace.clone())));
        registry.register(Arc::new(file_ops::FileListTool::new(workspace.clone())));
        registry.register(Arc::new(file_ops::FileDeleteTool::new(workspace.clone())));
        registry.register(Arc::new(process::RunProcessTool::new(workspace.clone(), self.code_timeout_seconds)));
        registry.register(Arc::new(patch::PatchTool::new(workspace.clone())));
        registry.register(Arc::new(control::CompleteTaskTool));
        registry.register(Arc::new(control::ManageContextTool));
        registry.register(Arc::new(RevealTool::new(workspace.clone(), reveal_log.clone())));

        let agent = Arc::new(AgentCore::new(
            self.worker_config.clone(),
            self.worker_model.clone(),
            self.summarizer.clone(),
            Arc::new(registry),
            workspace.clone(),
            Arc::new(PromptQueue::new()),
            Arc::new(StatusBus::default()),
            self.logger.clone(),
        ));
        agent.link_cancellation(stage_cancel);

        Ok(WorkerHandle {
            id: worker_id,
            agent,
            workspace,
            reveal_log,
        })
    }

    fn emit(&self, message: impl Into<String>) {
        self.logger.emit(EnhancedLogEntry::new(LogCategory::Tournament, message));
    }
}

/// Run every handle's agent concurrently through one phase (initial run or a
/// debate round) and collect each worker's completion record, indexed by
/// handle position. A worker that panics or errors out contributes `None`
/// rather than aborting the stage — isolation at the stage boundary, per
/// spec.md's failure semantics.
async fn spawn_and_collect(handles: &[WorkerHandle], prompts: Vec<String>, use_restart: bool) -> Vec<Option<CompletionRecord>> {
    let mut join_set = JoinSet::new();
    for (idx, (handle, prompt)) in handles.iter().zip(prompts).enumerate() {
        let agent = handle.agent.clone();
        join_set.spawn(async move {
            if use_restart {
                let _ = agent.restart(Some(prompt), true).await;
            } else {
                let _ = agent.start(Some(prompt)).await;
            }
            (idx, agent.run().await)
        });
    }

    let mut results: Vec<Option<CompletionRecord>> = vec![None; handles.len()];
    while let Some(res) = join_set.join_next().await {
        if let Ok((idx, Ok(record))) = res {
            results[idx] = record;
        }
    }
    results
}

fn build_initial_prompt(worker_id: &str, topic: &str, predecessor: &[RevealedArtifact]) -> String {
    if predecessor.is_empty() {
        format!(
            "You are worker {worker_id}. Tournament topic: {topic}\n\nThis is the first stage; there \
is no prior stage output. Work toward the topic. Call `reveal` on every file you want downstream \
stages and debate peers to see, then call complete_task when you are done."
        )
    } else {
        let mut listing = String::new();
        for artifact in predecessor {
            listing.push_str(&format!("- {} ({})\n", artifact.filename, artifact.description));
        }
        format!(
            "You are worker {worker_id}. Tournament topic: {topic}\n\nThe previous stage revealed:\n{listing}\n\
Build on, critique, or replace these as you see fit. Call `reveal` on every file you want \
downstream stages and debate peers to see, then call complete_task when you are done."
        )
    }
}

fn build_debate_prompt(round: usize, peers: &[RevealedArtifact]) -> String {
    let mut listing = String::new();
    for artifact in peers {
        listing.push_str(&format!("- {} ({}):\n{}\n\n", artifact.filename, artifact.description, artifact.content));
    }
    format!(
        "Debate round {round}. Your peers in this stage revealed:\n{listing}\n\
Critique their work against your own. If it changes your conclusion, update your files and call \
`reveal` again; otherwise defend your position. Call complete_task when you are done with this round."
    )
}

fn peer_reveal_set(snapshots: &[Vec<RevealedArtifact>], idx: usize) -> Vec<RevealedArtifact> {
    snapshots
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .flat_map(|(_, s)| s.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ModelError;
    use crate::ai::types::{CompletionRequest, CompletionResponse, FinishReason, MessageRole, ToolCall, Usage};
    use async_trait::async_trait;
    use serde_json::json;

    /// Drives each worker through write → reveal → complete_task purely by
    /// inspecting the last tool result in the conversation, so it behaves
    /// correctly whether or not `choice.md` already exists (stage 1 workers
    /// start empty; a stage-2 worker inherits a pre-seeded predecessor file
    /// and can reveal it immediately). Content is keyed off the worker id
    /// embedded in the goal message by `build_initial_prompt`, so two
    /// workers sharing one provider instance still diverge deterministically.
    struct AdaptiveWorkerProvider;

    #[async_trait]
    impl LLMProvider for AdaptiveWorkerProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
            let content = if request.messages.iter().any(|m| m.content.contains("-w0")) {
                "A"
            } else {
                "B"
            };
            let last_tool_result = request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::ToolResult)
                .map(|m| m.content.clone());

            let tool_calls = match last_tool_result.as_deref() {
                None => vec![ToolCall::new(
                    "c1",
                    "reveal",
                    json!({"filename": "choice.md", "description": content}),
                )],
                Some(text) if text.starts_with("revealed") => {
                    vec![ToolCall::new("c2", "complete_task", json!({"reason": "done", "summary": content}))]
                }
                Some(text) if text.starts_with("wrote") => vec![ToolCall::new(
                    "c3",
                    "reveal",
                    json!({"filename": "choice.md", "description": content}),
                )],
                Some(_) => vec![ToolCall::new(
                    "c4",
                    "file_write",
                    json!({"path": "choice.md", "content": content}),
                )],
            };

            Ok(CompletionResponse {
                content: String::new(),
                tool_calls,
                model: "scripted".to_string(),
                usage: Usage::default(),
                finish_reason: FinishReason::ToolCalls,
            })
        }
        fn context_limit(&self) -> usize {
            128_000
        }
        fn supports_tools(&self) -> bool {
            true
        }
        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    fn engine(sandbox: &std::path::Path) -> TournamentEngine {
        TournamentEngine::new(
            Arc::new(AdaptiveWorkerProvider),
            Arc::new(AdaptiveWorkerProvider),
            AgentConfig::default(),
            5,
            sandbox,
            EnhancedLogger::new(200),
        )
    }

    #[tokio::test]
    async fn rejects_invalid_stage_shape() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine(dir.path()).run("topic", vec![2, 4], 0).await.unwrap_err();
        assert!(matches!(err, TournamentError::InvalidStages));
    }

    #[tokio::test]
    async fn two_stage_tournament_merges_collision_and_synthesizes() {
        let dir = tempfile::tempdir().unwrap();
        let tournament = engine(dir.path())
            .run("pick A or B", vec![2, 1], 0)
            .await
            .expect("tournament should complete");

        assert_eq!(tournament.status, TournamentStatus::Complete);
        assert_eq!(tournament.stage_records.len(), 2);
        assert_eq!(tournament.stage_records[0].workers.len(), 2);
        assert_eq!(tournament.stage_records[1].workers.len(), 1);

        // Stage 1's two workers both reveal `choice.md`; the collision note
        // is recorded on stage 2's record, per spec's "new stage's
        // transcript" rule.
        assert_eq!(tournament.stage_records[1].conflict_notes.len(), 1);
        assert!(tournament.stage_records[1].conflict_notes[0].contains("choice.md"));

        let finals = tournament.final_artifacts.expect("final artifacts");
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].filename, "choice.md");
    }

    #[tokio::test]
    async fn single_worker_single_stage_without_collision() {
        let dir = tempfile::tempdir().unwrap();
        let tournament = engine(dir.path()).run("topic", vec![1], 0).await.unwrap();
        assert_eq!(tournament.status, TournamentStatus::Complete);
        assert!(tournament.stage_records[0].conflict_notes.is_empty());
        assert_eq!(tournament.final_artifacts.unwrap().len(), 1);
    }
}
