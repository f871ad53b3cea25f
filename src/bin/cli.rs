//! Headless CLI control surface for the agent runtime.
//!
//! Builds a single `AgentCore` wrapped in a `LifecycleController` in-process
//! (there is no daemon/gateway in this runtime — `LifecycleController` lives
//! in the same process as its caller) and exposes the lifecycle command set
//! as both direct subcommands and an interactive REPL, modeled on the
//! teacher's `mesoclaw` CLI (`Parser`/`Subcommand`, global `--json`/`--raw`
//! flags, a stdin loop that re-parses each line through `try_parse_from`).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use agentcore::agent::{Priority, RunMode};
use agentcore::ai::providers::echo::EchoProvider;
use agentcore::ai::providers::reliable::RetryingModelClient;
use agentcore::prelude::*;
use agentcore::tools::ToolProfile;
use agentcore::tournament::TournamentEngine;
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(
    name = "agentcore",
    about = "Autonomous agent runtime CLI",
    version,
    long_about = "Headless control surface for the agent loop engine and tournament \
                  orchestrator.\nRun `agentcore start` to begin a session and drop into \
                  the control REPL, or `agentcore tournament` for a one-shot run."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file. Missing sections fall back to defaults.
    #[arg(long, global = true, default_value = "agentcore.toml")]
    config: String,

    /// Output results as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a session and enter the interactive control REPL.
    Start(StartArgs),
    /// Run a tournament to completion and print the synthesized result.
    Tournament(TournamentArgs),
}

#[derive(Parser, Debug)]
struct StartArgs {
    /// Initial goal/prompt for the agent.
    goal: Option<String>,
    /// Run forever, processing queued prompts, instead of stopping after
    /// `complete_task`.
    #[arg(long)]
    continuous: bool,
}

#[derive(Parser, Debug)]
struct TournamentArgs {
    /// Topic/goal handed to every worker's initial prompt.
    topic: String,
    /// Comma-separated, strictly non-increasing worker counts per stage,
    /// e.g. "4,2,1". Defaults to the config's `tournament.default_stages`.
    #[arg(long)]
    stages: Option<String>,
    /// Debate rounds run within each stage. Defaults to the config's
    /// `tournament.default_debate_rounds`.
    #[arg(long)]
    debate_rounds: Option<usize>,
}

/// Commands accepted at the `start` REPL prompt. A separate, smaller grammar
/// than the top-level `Cli` since none of these take `--config`/`--json`.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ReplLine {
    #[command(subcommand)]
    command: ReplCommand,
}

#[derive(Subcommand, Debug)]
enum ReplCommand {
    /// Print the current lifecycle state and loop counters.
    Status,
    /// Pause after the in-flight turn.
    Pause,
    /// Resume a paused agent.
    Resume,
    /// Stop the agent, waiting for quiescence.
    Stop,
    /// Stop and restart, optionally injecting a prompt.
    Restart {
        prompt: Option<String>,
        #[arg(long)]
        keep_context: bool,
    },
    /// Force a context compaction outside the normal threshold check.
    Compact,
    /// Enqueue a prompt for the agent to pick up at its next turn boundary.
    Enqueue {
        text: String,
        #[arg(long)]
        high: bool,
    },
    /// Remove a previously enqueued prompt by id.
    Remove { id: String },
    /// Stop the agent, purge its workspace, and return to idle.
    FactoryReset {
        #[arg(long)]
        confirm: bool,
        #[arg(long)]
        backup: bool,
    },
    /// Leave the REPL. The agent, if still running, keeps running in the
    /// background task but this process exits without joining it.
    Exit,
}

fn print_value(value: &serde_json::Value, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    } else {
        println!("{value}");
    }
}

fn print_err(msg: &str) {
    eprintln!("\x1b[31merror\x1b[0m: {msg}");
}

fn build_provider(model: &str) -> Arc<dyn LLMProvider> {
    // No live vendor wiring ships by default (see `ai::providers::openai_compatible`'s
    // module doc) — the echo provider keeps `start`/`tournament` runnable
    // out of the box, wrapped in the same retry/fallback client a real
    // provider would use.
    let _ = model;
    Arc::new(RetryingModelClient::new(Arc::new(EchoProvider::new())))
}

fn build_controller(config: &RuntimeConfig, run_mode: RunMode) -> Result<LifecycleController, String> {
    let root = PathBuf::from(&config.sandbox.root).join(format!("session-{}", uuid::Uuid::new_v4()));
    let workspace = Arc::new(WorkspaceFs::new(root).map_err(|e| e.to_string())?);

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(agentcore::tools::file_ops::FileReadTool::new(workspace.clone())));
    tools.register(Arc::new(agentcore::tools::file_ops::FileWriteTool::new(workspace.clone())));
    tools.register(Arc::new(agentcore::tools::file_ops::FileListTool::new(workspace.clone())));
    tools.register(Arc::new(agentcore::tools::file_ops::FileDeleteTool::new(workspace.clone())));
    if config.agent.enable_code_execution {
        tools.register(Arc::new(agentcore::tools::process::RunProcessTool::new(
            workspace.clone(),
            config.agent.code_timeout_seconds,
        )));
    }
    tools.register(Arc::new(agentcore::tools::patch::PatchTool::new(workspace.clone())));
    tools.register(Arc::new(agentcore::tools::control::CompleteTaskTool));
    tools.register(Arc::new(agentcore::tools::control::ManageContextTool));

    let agent_config = AgentConfig {
        model: config.model.main.clone(),
        summarizer_model: config.model.summarizer.clone(),
        max_turns: config.agent.max_turns,
        context_max_tokens: config.context.max_tokens,
        compaction_threshold: config.context.compaction_threshold,
        run_mode,
        tool_profile: ToolProfile::Full,
        ..Default::default()
    };

    let agent = Arc::new(AgentCore::new(
        agent_config,
        build_provider(&config.model.main),
        build_provider(&config.model.summarizer),
        Arc::new(tools),
        workspace,
        Arc::new(PromptQueue::new()),
        Arc::new(StatusBus::default()),
        EnhancedLogger::new(2000),
    ));

    Ok(LifecycleController::new(agent))
}

fn status_json(controller: &LifecycleController) -> serde_json::Value {
    let status = controller.agent().status_bus().current();
    json!({
        "state": status.state,
        "loop_count": status.loop_count,
        "total_tokens": status.total_tokens,
        "queue_len": controller.agent().queue().len(),
    })
}

async fn run_repl(controller: &LifecycleController, json_mode: bool) {
    println!("agentcore control REPL. Type 'help' for commands, 'exit' to quit.");
    let stdin = io::stdin();
    loop {
        print!("agentcore> ");
        io::stdout().flush().unwrap_or_default();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                print_err(&format!("read error: {e}"));
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "help" || trimmed == "?" {
            println!("Commands: status | pause | resume | stop | restart [prompt] [--keep-context] | compact | enqueue <text> [--high] | remove <id> | factory-reset [--confirm] [--backup] | exit");
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let parsed = ReplLine::try_parse_from(parts);
        let Ok(ReplLine { command }) = parsed else {
            print_err("unrecognized command. Type 'help' for the list.");
            continue;
        };

        match command {
            ReplCommand::Status => print_value(&status_json(controller), json_mode),
            ReplCommand::Pause => match controller.pause() {
                Ok(()) => println!("pausing after the in-flight turn"),
                Err(e) => print_err(&e.to_string()),
            },
            ReplCommand::Resume => match controller.resume() {
                Ok(()) => println!("resumed"),
                Err(e) => print_err(&e.to_string()),
            },
            ReplCommand::Stop => match controller.stop().await {
                Ok(()) => println!("stopped"),
                Err(e) => print_err(&e.to_string()),
            },
            ReplCommand::Restart { prompt, keep_context } => {
                match controller.restart(prompt, keep_context).await {
                    Ok(()) => println!("restarted"),
                    Err(e) => print_err(&e.to_string()),
                }
            }
            ReplCommand::Compact => match controller.force_compact().await {
                Ok(()) => println!("context compacted"),
                Err(e) => print_err(&e.to_string()),
            },
            ReplCommand::Enqueue { text, high } => {
                let priority = if high { Priority::High } else { Priority::Normal };
                let id = controller.agent().queue().enqueue(text, priority);
                println!("enqueued {id}");
            }
            ReplCommand::Remove { id } => {
                if controller.agent().queue().remove(&id) {
                    println!("removed {id}");
                } else {
                    print_err(&format!("no queued prompt with id '{id}'"));
                }
            }
            ReplCommand::FactoryReset { confirm, backup } => {
                match controller.factory_reset(confirm, backup).await {
                    Ok(outcome) => {
                        let archived = outcome.archive_bytes.as_ref().map(Vec::len).unwrap_or(0);
                        println!("factory reset complete ({archived} backup bytes)");
                    }
                    Err(e) => print_err(&e.to_string()),
                }
            }
            ReplCommand::Exit => {
                println!("leaving REPL; the agent keeps running in the background");
                break;
            }
        }
    }
}

async fn handle_start(args: StartArgs, config: &RuntimeConfig, json_mode: bool) {
    let run_mode = if args.continuous { RunMode::Continuous } else { RunMode::TaskScoped };
    let controller = match build_controller(config, run_mode) {
        Ok(controller) => controller,
        Err(e) => {
            print_err(&e);
            return;
        }
    };

    if let Err(e) = controller.start(args.goal).await {
        print_err(&e.to_string());
        return;
    }

    run_repl(&controller, json_mode).await;
}

async fn handle_tournament(args: TournamentArgs, config: &RuntimeConfig, json_mode: bool) {
    let stages = match &args.stages {
        Some(raw) => match raw.split(',').map(|s| s.trim().parse::<usize>()).collect::<Result<Vec<_>, _>>() {
            Ok(s) => s,
            Err(e) => {
                print_err(&format!("invalid --stages '{raw}': {e}"));
                return;
            }
        },
        None => config.tournament.default_stages.clone(),
    };
    let debate_rounds = args.debate_rounds.unwrap_or(config.tournament.default_debate_rounds as usize);

    let sandbox_root = PathBuf::from(&config.sandbox.root).join(format!("tournament-{}", uuid::Uuid::new_v4()));
    if let Err(e) = std::fs::create_dir_all(&sandbox_root) {
        print_err(&format!("failed to create sandbox dir: {e}"));
        return;
    }

    let worker_config = AgentConfig {
        model: config.model.worker.clone(),
        summarizer_model: config.model.summarizer.clone(),
        context_max_tokens: config.context.max_tokens,
        compaction_threshold: config.context.compaction_threshold,
        ..Default::default()
    };

    let engine = TournamentEngine::new(
        build_provider(&config.model.worker),
        build_provider(&config.model.summarizer),
        worker_config,
        config.agent.code_timeout_seconds,
        sandbox_root,
        EnhancedLogger::new(2000),
    );

    match engine.run(&args.topic, stages, debate_rounds).await {
        Ok(tournament) => print_value(&serde_json::to_value(&tournament).unwrap_or_default(), json_mode),
        Err(e) => print_err(&e.to_string()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = match RuntimeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            print_err(&format!("config: {e}"));
            return;
        }
    };

    match cli.command {
        Commands::Start(args) => handle_start(args, &config, cli.json).await,
        Commands::Tournament(args) => handle_tournament(args, &config, cli.json).await,
    }
}
