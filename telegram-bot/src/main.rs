//! Process entrypoint: load config, acquire the single-instance lock, wire every component, run
//! the long-poll dispatcher (spec §4 component wiring, spec §6 "Single-instance").

mod ack;
mod action_callbacks;
mod approvals;
mod chat_provider;
mod commands;
mod handlers;
mod lock;
mod log_format;
mod logging;
mod run_chat;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use goc_client::KnowledgeStoreClient;
use supervisor_core::action::Risk;
use supervisor_core::goc::GocCoordinator;
use supervisor_core::planner::ChatProvider;
use supervisor_core::registry::{AgentRegistry, AgentWriter};
use supervisor_core::run_manager::RunManager;
use supervisor_core::session::SessionStore;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tracing::{error, info};

use crate::ack::TelegramAck;
use crate::action_callbacks::BotActionCallbacks;
use crate::chat_provider::HttpChatProvider;
use crate::lock::InstanceLock;
use crate::run_chat::SupervisorRunChat;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init() {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = config::load_and_apply("supervisor", None) {
        error!(error = %e, "failed to load config, continuing with process environment only");
    }

    let base_dir = std::env::var("SUPERVISOR_BASE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().expect("current dir is readable"));

    let _lock = match InstanceLock::acquire(&base_dir) {
        Ok(lock) => lock,
        Err(e) => {
            error!(error = %e, "refusing to start");
            std::process::exit(1);
        }
    };

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

    let bot = Bot::from_env();

    let mut state = AppState::new(
        bot.clone(),
        sessions.clone(),
        registry.clone(),
        writer.clone(),
        goc.clone(),
        client.clone(),
        runs_dir,
        base_dir.clone(),
    );
    apply_settings(&mut state, &config::load_settings(&base_dir)).await;
    let state = Arc::new(state);

    let callbacks = Arc::new(BotActionCallbacks::new(
        registry,
        writer,
        goc,
        sessions.clone(),
        state.job_config.clone(),
        base_dir,
    ));
    let chat_provider: Arc<dyn ChatProvider> = Arc::new(HttpChatProvider::from_env());
    let run_chat = Arc::new(SupervisorRunChat::new(state.clone(), callbacks, chat_provider));
    let ack = Arc::new(TelegramAck::new(bot.clone()));
    let run_manager = Arc::new(RunManager::new(sessions, run_chat.clone(), ack));

    let handler = teloxide::dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback_query));

    info!("telegram-bot starting long-poll dispatch");
    Dispatcher::builder(bot, handler)
        .dependencies(teloxide::dptree::deps![state, run_manager, run_chat])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("telegram-bot shut down cleanly");
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
            let parsed: std::collections::HashSet<Risk> = risks
                .split(',')
                .filter_map(|tag| match tag.trim() {
                    "L1" => Some(Risk::L1),
                    "L2" => Some(Risk::L2),
                    "L3" => Some(Risk::L3),
                    _ => None,
                })
                .collect();
            if !parsed.is_empty() {
                state.approval.require_for_risk = parsed;
            }
        }
    }
}
