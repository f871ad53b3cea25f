//! `AgentCore` — the core reasoning loop engine.
//!
//! Grounded in the teacher's `AgentLoop`/`AgentConfig`/`AgentMessage` shape
//! (`agent/loop_.rs`): a `build_context → LLM.complete → dispatch tool calls
//! → loop` algorithm, generalized here into the five suspension points this
//! runtime's concurrency model names — pre-drain, awaiting the model,
//! awaiting a tool, during compaction, and pause/resume — and driven by an
//! explicit state machine rather than a single linear `for` loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio_util::sync::CancellationToken;

use crate::ai::provider::{LLMProvider, ModelError};
use crate::ai::types::{CompletionRequest, Message, ToolSchema};
use crate::logging::{EnhancedLogEntry, EnhancedLogger, LogCategory};
use crate::status::{AgentState, AgentStatus, StatusBus};
use crate::tools::{ToolProfile, ToolRegistry, COMPLETE_TASK, MANAGE_CONTEXT};
use crate::workspace::WorkspaceFs;

use super::context::{ContextError, ContextManager};
use super::prompt_queue::PromptQueue;
use super::tool_parser::parse_tool_calls;

/// Whether a `complete_task` call ends the whole run or just the current
/// sub-task. See the Open Question resolution this implements: continuous
/// mode is the default for a main agent, task-scoped for every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Continuous,
    TaskScoped,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub summarizer_model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_turns: Option<usize>,
    pub context_max_tokens: usize,
    pub compaction_threshold: f64,
    pub model_call_timeout: Duration,
    pub tool_timeout: Duration,
    pub run_mode: RunMode,
    pub tool_profile: ToolProfile,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            summarizer_model: "gpt-4o-mini".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(4096),
            max_turns: None,
            context_max_tokens: 128_000,
            compaction_threshold: 0.8,
            model_call_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
            run_mode: RunMode::TaskScoped,
            tool_profile: ToolProfile::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Finished,
    Stuck,
    Blocked,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub reason: CompletionReason,
    pub summary: String,
    pub output: Option<String>,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("goal must be non-empty to start the agent")]
    RejectGoalEmpty,
    #[error("operation not valid from state {0:?}")]
    InvalidState(AgentState),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

enum TurnOutcome {
    Continue,
    Stopped,
    Completed(CompletionRecord),
}

/// A single agent: pairs a `ContextManager` with a `ModelClient` and a
/// `ToolRegistry`, behind the state machine spec.md names.
pub struct AgentCore {
    config: AgentConfig,
    model: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    workspace: Arc<WorkspaceFs>,
    context: AsyncMutex<ContextManager>,
    queue: Arc<PromptQueue>,
    status_bus: Arc<StatusBus>,
    logger: Arc<EnhancedLogger>,
    state_tx: watch::Sender<AgentState>,
    state_rx: watch::Receiver<AgentState>,
    resume_notify: Notify,
    cancel: SyncMutex<CancellationToken>,
    loop_count: AtomicU64,
    total_tokens: AtomicU64,
    completed_this_reply: SyncMutex<bool>,
}

impl AgentCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AgentConfig,
        model: Arc<dyn LLMProvider>,
        summarizer: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        workspace: Arc<WorkspaceFs>,
        queue: Arc<PromptQueue>,
        status_bus: Arc<StatusBus>,
        logger: Arc<EnhancedLogger>,
    ) -> Self {
        let context = ContextManager::new(
            config.context_max_tokens,
            config.compaction_threshold,
            summarizer,
            config.summarizer_model.clone(),
        );
        let (state_tx, state_rx) = watch::channel(AgentState::Idle);
        Self {
            config,
            model,
            tools,
            workspace,
            context: AsyncMutex::new(context),
            queue,
            status_bus,
            logger,
            state_tx,
            state_rx,
            resume_notify: Notify::new(),
            cancel: SyncMutex::new(CancellationToken::new()),
            loop_count: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
            completed_this_reply: SyncMutex::new(false),
        }
    }

    pub fn state(&self) -> AgentState {
        *self.state_rx.borrow()
    }

    pub fn workspace(&self) -> &Arc<WorkspaceFs> {
        &self.workspace
    }

    pub fn queue(&self) -> Arc<PromptQueue> {
        self.queue.clone()
    }

    pub fn status_bus(&self) -> Arc<StatusBus> {
        self.status_bus.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    /// Re-root this agent's cancellation token as a child of `parent`, so
    /// cancelling `parent` cascades here without the reverse holding: this
    /// agent's own `stop()` never affects siblings. Must be called before
    /// `start()`; a later call after turns are already in flight would race
    /// the held clone inside `run_turn`.
    pub fn link_cancellation(&self, parent: &CancellationToken) {
        *self.cancel.lock() = parent.child_token();
    }

    fn set_state(&self, state: AgentState) {
        let _ = self.state_tx.send(state);
    }

    // ── Control surface ──────────────────────────────────────────────────

    pub async fn start(&self, goal: Option<String>) -> Result<(), AgentError> {
        let goal = goal
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .ok_or(AgentError::RejectGoalEmpty)?;

        if self.state() != AgentState::Idle {
            return Err(AgentError::InvalidState(self.state()));
        }

        {
            let mut ctx = self.context.lock().await;
            ctx.append(Message::user(goal));
        }
        self.set_state(AgentState::Running);
        self.emit(LogCategory::Lifecycle, "agent started");
        self.publish_status("started").await;
        Ok(())
    }

    pub fn pause(&self) -> Result<(), AgentError> {
        if self.state() != AgentState::Running {
            return Err(AgentError::InvalidState(self.state()));
        }
        self.set_state(AgentState::Paused);
        self.emit(LogCategory::Lifecycle, "agent paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), AgentError> {
        if self.state() != AgentState::Paused {
            return Err(AgentError::InvalidState(self.state()));
        }
        self.set_state(AgentState::Running);
        self.resume_notify.notify_waiters();
        self.emit(LogCategory::Lifecycle, "agent resumed");
        Ok(())
    }

    /// Flip to `stopping` and cancel the current token. The run loop
    /// transitions to `stopped` once the in-flight turn finishes or aborts.
    pub fn stop(&self) {
        if matches!(self.state(), AgentState::Stopped | AgentState::Stopping) {
            return;
        }
        self.set_state(AgentState::Stopping);
        self.cancel.lock().cancel();
        self.resume_notify.notify_waiters();
        self.emit(LogCategory::Lifecycle, "agent stopping");
    }

    /// Atomic stop+start: waits for quiescence, resets context unless
    /// `keep_context`, optionally injects `prompt`, then re-enters running.
    pub async fn restart(&self, prompt: Option<String>, keep_context: bool) -> Result<(), AgentError> {
        self.stop();
        let mut rx = self.state_rx.clone();
        while *rx.borrow() != AgentState::Stopped {
            if rx.changed().await.is_err() {
                break;
            }
        }

        if !keep_context {
            let mut ctx = self.context.lock().await;
            *ctx = ContextManager::new(
                self.config.context_max_tokens,
                self.config.compaction_threshold,
                ctx_summarizer_placeholder(&self.model),
                self.config.summarizer_model.clone(),
            );
        }
        if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
            let mut ctx = self.context.lock().await;
            ctx.append(Message::user(prompt));
        }

        *self.cancel.lock() = CancellationToken::new();
        self.set_state(AgentState::Running);
        self.emit(LogCategory::Lifecycle, "agent restarted");
        Ok(())
    }

    pub async fn force_compact(&self) -> Result<(), ContextError> {
        self.context.lock().await.compact().await
    }

    /// `FactoryReset`'s agent-side half: stop, wait for quiescence, clear
    /// context and queued prompts, zero counters, and land in `idle`. The
    /// workspace purge and optional backup archive are the caller's
    /// (`LifecycleController`'s) responsibility — those are filesystem
    /// concerns, not agent state.
    pub async fn reset_to_idle(&self) {
        self.stop();
        let mut rx = self.state_rx.clone();
        while *rx.borrow() != AgentState::Stopped {
            if rx.changed().await.is_err() {
                break;
            }
        }

        {
            let mut ctx = self.context.lock().await;
            *ctx = ContextManager::new(
                self.config.context_max_tokens,
                self.config.compaction_threshold,
                ctx_summarizer_placeholder(&self.model),
                self.config.summarizer_model.clone(),
            );
        }
        self.queue.drain();
        self.loop_count.store(0, AtomicOrdering::SeqCst);
        self.total_tokens.store(0, AtomicOrdering::SeqCst);
        *self.cancel.lock() = CancellationToken::new();
        self.set_state(AgentState::Idle);
        self.emit(LogCategory::Lifecycle, "factory reset: agent state cleared");
        self.publish_status("factory_reset").await;
    }

    // ── Turn loop ─────────────────────────────────────────────────────────

    /// Drive turns until the run terminates: either `complete_task` ends a
    /// task-scoped run, `max_turns` is exceeded, or an external `Stop`
    /// transitions the agent to `stopped`.
    pub async fn run(&self) -> Result<Option<CompletionRecord>, AgentError> {
        loop {
            match self.run_turn().await? {
                TurnOutcome::Continue => continue,
                TurnOutcome::Stopped => return Ok(None),
                TurnOutcome::Completed(record) => return Ok(Some(record)),
            }
        }
    }

    async fn run_turn(&self) -> Result<TurnOutcome, AgentError> {
        // 1. Paused: block on resume, honoring cooperative cancellation.
        if self.state() == AgentState::Paused {
            let cancel = self.cancellation_token();
            tokio::select! {
                _ = self.resume_notify.notified() => {}
                _ = cancel.cancelled() => {
                    self.set_state(AgentState::Stopped);
                    return Ok(TurnOutcome::Stopped);
                }
            }
            if self.state() == AgentState::Paused {
                // spurious wake (e.g. Stop fired the same notify); re-check next turn.
                return Ok(TurnOutcome::Continue);
            }
        }

        // 2. Stopping: exit.
        if self.state() == AgentState::Stopping {
            self.set_state(AgentState::Stopped);
            self.emit(LogCategory::Lifecycle, "agent stopped");
            self.publish_status("stopped").await;
            return Ok(TurnOutcome::Stopped);
        }

        if let Some(max_turns) = self.config.max_turns {
            if self.loop_count.load(AtomicOrdering::SeqCst) as usize >= max_turns {
                self.set_state(AgentState::Stopped);
                return Ok(TurnOutcome::Completed(CompletionRecord {
                    reason: CompletionReason::Stuck,
                    summary: "max_turns_exceeded".to_string(),
                    output: None,
                }));
            }
        }

        // 3. Drain PromptQueue in priority order.
        for item in self.queue.drain() {
            self.context.lock().await.append(Message::user(item.text));
        }

        // 4. Compact if needed.
        {
            let mut ctx = self.context.lock().await;
            if ctx.should_compact() {
                if let Err(err) = ctx.compact().await {
                    self.emit(LogCategory::Error, format!("compaction failed: {err}"));
                }
            }
        }

        // 5. Build request and call the model.
        let (messages, tool_schemas) = {
            let ctx = self.context.lock().await;
            let schemas: Vec<ToolSchema> = self
                .tools
                .list_filtered(self.config.tool_profile)
                .into_iter()
                .map(|info| ToolSchema {
                    name: info.name,
                    description: info.description,
                    parameters: info.schema,
                })
                .collect();
            (ctx.messages().to_vec(), schemas)
        };

        let mut request = CompletionRequest::new(self.config.model.clone(), messages).with_tools(tool_schemas);
        if let Some(t) = self.config.temperature {
            request = request.with_temperature(t);
        }
        if let Some(m) = self.config.max_tokens {
            request = request.with_max_tokens(m);
        }

        let cancel = self.cancellation_token();
        let response = tokio::select! {
            result = tokio::time::timeout(self.config.model_call_timeout, self.model.complete(request)) => {
                match result {
                    Ok(Ok(response)) => response,
                    // RetryingModelClient already exhausts retries before an error
                    // reaches this layer, so nothing here distinguishes retryable
                    // from fatal; any error that gets here ends the run.
                    Ok(Err(err)) => {
                        self.set_state(AgentState::Error);
                        self.emit(LogCategory::Error, format!("model error: {err}"));
                        return Err(AgentError::Model(err));
                    }
                    Err(_) => {
                        self.set_state(AgentState::Error);
                        self.emit(LogCategory::Error, "model call timed out");
                        return Err(AgentError::Model(ModelError::Timeout {
                            provider: self.model.provider_name().to_string(),
                        }));
                    }
                }
            }
            _ = cancel.cancelled() => {
                self.set_state(AgentState::Stopped);
                return Ok(TurnOutcome::Stopped);
            }
        };

        self.total_tokens
            .fetch_add(response.usage.total_tokens as u64, AtomicOrdering::SeqCst);

        // 6. Append assistant reply; resolve tool calls from either the
        // structured response field or, failing that, inline text markup.
        let tool_calls = if response.tool_calls.is_empty() {
            parse_tool_calls(&response.content)
                .into_iter()
                .map(|parsed| {
                    let id = parsed.call_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    let mut call = crate::ai::types::ToolCall::new(id, parsed.name, parsed.arguments);
                    if let Some(desc) = parsed.tool_description {
                        call = call.with_description(desc);
                    }
                    call
                })
                .collect()
        } else {
            response.tool_calls.clone()
        };

        {
            let mut ctx = self.context.lock().await;
            ctx.append(Message::assistant_with_tool_calls(response.content.clone(), tool_calls.clone()));
        }
        self.emit(LogCategory::Llm, format!("completion from '{}'", response.model));

        self.loop_count.fetch_add(1, AtomicOrdering::SeqCst);

        // 7. Dispatch tool calls, in order, honoring completion uniqueness.
        *self.completed_this_reply.lock() = false;
        for call in &tool_calls {
            if *self.completed_this_reply.lock() {
                break;
            }

            if call.name == COMPLETE_TASK {
                *self.completed_this_reply.lock() = true;
                let reason = call.arguments.get("reason").and_then(|v| v.as_str()).unwrap_or("").to_string();
                let summary = call
                    .arguments
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .unwrap_or("(no summary provided)")
                    .to_string();
                let output = call.arguments.get("output").and_then(|v| v.as_str()).map(str::to_string);

                self.context
                    .lock()
                    .await
                    .append(Message::tool_result(call.id.clone(), format!("task completed: {summary}")));
                self.emit(LogCategory::Lifecycle, format!("complete_task: {reason}"));

                let record = CompletionRecord {
                    reason: match reason.as_str() {
                        "stuck" => CompletionReason::Stuck,
                        "blocked" => CompletionReason::Blocked,
                        "error" => CompletionReason::Error,
                        _ => CompletionReason::Finished,
                    },
                    summary,
                    output,
                };

                match self.config.run_mode {
                    RunMode::TaskScoped => {
                        self.set_state(AgentState::Stopped);
                        self.publish_status("complete_task").await;
                        return Ok(TurnOutcome::Completed(record));
                    }
                    RunMode::Continuous => {
                        self.context.lock().await.append(Message::user(
                            "Continue toward the goal, or await further instruction.",
                        ));
                    }
                }
            } else if call.name == MANAGE_CONTEXT {
                let output = self.handle_manage_context(&call.arguments).await;
                self.context.lock().await.append(Message::tool_result(call.id.clone(), output));
            } else {
                let cancel = self.cancellation_token();
                let outcome = tokio::select! {
                    result = tokio::time::timeout(self.config.tool_timeout, self.tools.invoke(&call.name, call.arguments.clone())) => result,
                    _ = cancel.cancelled() => {
                        self.set_state(AgentState::Stopped);
                        return Ok(TurnOutcome::Stopped);
                    }
                };

                let text = match outcome {
                    Ok(Ok(result)) => result.output,
                    Ok(Err(err)) => format!("error: {err}"),
                    Err(_) => "error: tool call timed out".to_string(),
                };
                self.context
                    .lock()
                    .await
                    .append(Message::tool_result(call.id.clone(), text));
                self.emit(
                    LogCategory::Tool,
                    EnhancedLogEntry::for_tool_call(
                        call.name.clone(),
                        call.arguments.clone(),
                        call.tool_description.as_deref(),
                    )
                    .message,
                );
            }
        }

        self.publish_status("turn").await;

        // 8. Loop back to step 1 regardless of whether tool calls fired.
        Ok(TurnOutcome::Continue)
    }

    async fn handle_manage_context(&self, args: &serde_json::Value) -> String {
        let action = args.get("action").and_then(|v| v.as_str()).unwrap_or("");
        let mut ctx = self.context.lock().await;
        match action {
            "usage" => format!("context usage: {:.1}%", ctx.usage_percent() * 100.0),
            "force_compact" => match ctx.compact().await {
                Ok(()) => "context compacted".to_string(),
                Err(err) => format!("compaction failed: {err}"),
            },
            "set_threshold" => {
                let Some(threshold) = args.get("threshold").and_then(|v| v.as_f64()) else {
                    return "set_threshold requires a numeric 'threshold'".to_string();
                };
                match ctx.set_threshold(threshold) {
                    Ok(()) => format!("threshold set to {threshold}"),
                    Err(err) => format!("{err}"),
                }
            }
            other => format!("unknown manage_context action '{other}'"),
        }
    }

    fn emit(&self, category: LogCategory, message: impl Into<String>) {
        self.logger.emit(EnhancedLogEntry::new(category, message));
    }

    async fn publish_status(&self, last_action: &str) {
        let ctx = self.context.lock().await;
        self.status_bus.publish(AgentStatus {
            state: self.state(),
            loop_count: self.loop_count.load(AtomicOrdering::SeqCst),
            total_tokens: self.total_tokens.load(AtomicOrdering::SeqCst),
            last_action: last_action.to_string(),
            context_usage_percent: ctx.usage_percent(),
            queued_prompts: self.queue.snapshot(),
            todos_digest: None,
        });
    }
}

/// `restart()` without `keep_context` needs a fresh `ContextManager`, which
/// needs its own summarizer handle; the agent's primary model doubles as the
/// summarizer when no dedicated one applies to this helper's call site.
fn ctx_summarizer_placeholder(model: &Arc<dyn LLMProvider>) -> Arc<dyn LLMProvider> {
    model.clone()
}
