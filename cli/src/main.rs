//! Process entrypoint for `supervisor-cli`: load config, wire every component, run the
//! interactive operator console (spec §4 component wiring). Unlike `telegram-bot`, this binary
//! is meant to run alongside the bot for local inspection, so it does not take the single-
//! instance lock `telegram-bot/src/lock.rs` uses to protect the session store.

mod action_callbacks;
mod ack;
mod chat_provider;
mod log_format;
mod logging;
mod repl;
mod run_chat;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use goc_client::KnowledgeStoreClient;
use supervisor_core::goc::GocCoordinator;
use supervisor_core::planner::ChatProvider;
use supervisor_core::registry::{AgentRegistry, AgentWriter};
use supervisor_core::run_manager::RunManager;
use supervisor_core::session::SessionStore;
use tracing::{error, info};

use crate::ack::StdoutAck;
use crate::action_callbacks::CliActionCallbacks;
use crate::chat_provider::HttpChatProvider;
use crate::run_chat::CliRunChat;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "supervisor-cli", about = "Local operator console for the supervisor")]
struct Cli {
    /// Send a single message and exit instead of starting the interactive loop.
    #[arg(short, long)]
    message: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init() {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = config::load_and_apply("supervisor", None) {
        error!(error = %e, "failed to load config, continuing with process environment only");
    }

    let cli = Cli::parse();

    let base_dir = std::env::var("SUPERVISOR_BASE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().expect("current dir is readable"));

    let runs_dir = base_dir.join("runs");
    if let Err(e) = std::fs::create_dir_all(&runs_dir) {
        error!(error = %e, "failed to create runs directory");
        std::process::exit(1);
    }

    let goc_base = std::env::var("GOC_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8787".to_string());
    let goc_key = std::env::var("GOC_SERVICE_KEY").unwrap_or_default();
    let client = Arc::new(KnowledgeStoreClient::new(goc_base, goc_key));
    let goc = Arc::new(GocCoordinator::new(client.clone()));
    let registry = Arc::new(AgentRegistry::new(client.clone(), goc.clone()));
    let writer = Arc::new(AgentWriter::new(client.clone()));

    let sessions = match SessionStore::load(base_dir.join("chat_sessions.json")).await {
        Ok(sessions) => Arc::new(sessions),
        Err(e) => {
            error!(error = %e, "failed to load session store");
            std::process::exit(1);
        }
    };

    let mut state = AppState::new(sessions.clone(), registry.clone(), writer.clone(), goc.clone(), client.clone(), runs_dir, base_dir.clone());
    apply_settings(&mut state, &config::load_settings(&base_dir)).await;
    let state = Arc::new(state);

    let callbacks = Arc::new(CliActionCallbacks::new(registry, writer, goc, sessions.clone(), state.job_config.clone(), base_dir));
    let chat_provider: Arc<dyn ChatProvider> = Arc::new(HttpChatProvider::from_env());
    let run_chat = Arc::new(CliRunChat::new(state.clone(), callbacks, chat_provider));
    let ack = Arc::new(StdoutAck);
    let run_manager = Arc::new(RunManager::new(sessions, run_chat.clone(), ack));

    info!("supervisor-cli starting operator console");

    if let Some(message) = cli.message {
        if let Err(e) = run_manager.handle_incoming("local", "operator", &message).await {
            error!(error = %e, "failed to queue one-shot message");
            std::process::exit(1);
        }
        // Give the lazily-spawned drain loop a moment to run before the process exits.
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        return;
    }

    repl::run(state, run_chat, run_manager).await;
}

/// Seeds process-local `JobConfig`/`ApprovalConfig` defaults from `settings.md` (`## Budget`
/// `max_actions`, `## Approval` `require_file_write` / `require_for_risk`).
async fn apply_settings(state: &mut AppState, settings: &config::Settings) {
    if let Some(budget) = settings.get("Budget") {
        if let Some(max_actions) = budget.get("max_actions").and_then(|v| v.parse().ok()) {
            state.job_config.write().await.max_actions = Some(max_actions);
        }
    }
    if let Some(approval) = settings.get("Approval") {
        if let Some(require_file_write) = approval.get("require_file_write").and_then(|v| v.parse().ok()) {
            state.approval.require_file_write = require_file_write;
        }
        if let Some(risks) = approval.get("require_for_risk") {
            let parsed: std::collections::HashSet<supervisor_core::action::Risk> = risks
                .split(',')
                .filter_map(|tag| match tag.trim() {
                    "L1" => Some(supervisor_core::action::Risk::L1),
                    "L2" => Some(supervisor_core::action::Risk::L2),
                    "L3" => Some(supervisor_core::action::Risk::L3),
                    _ => None,
                })
                .collect();
            if !parsed.is_empty() {
                state.approval.require_for_risk = parsed;
            }
        }
    }
}
