//! Operator console loop: reads lines from stdin, dispatches `/whoami /running /stop /context
//! /agents` plus `/approve` and `/deny`, and routes everything else through [`RunManager`]
//! (spec §4 "operator console", mirroring `telegram-bot/src/handlers.rs`'s command dispatch
//! without a chat transport underneath).

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use supervisor_core::job;
use supervisor_core::run_manager::RunManager;
use supervisor_core::session::RunState;

use crate::ack::StdoutAck;
use crate::run_chat::CliRunChat;
use crate::state::AppState;

const LOCAL_CHAT_ID: &str = "local";
const LOCAL_USER_ID: &str = "operator";

type Manager = RunManager<CliRunChat, StdoutAck>;

pub async fn run(state: Arc<AppState>, run_chat: Arc<CliRunChat>, run_manager: Arc<Manager>) {
    println!("supervisor-cli. type a message, or /whoami /running /stop /context /agents /quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            break;
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_quit_command(line) {
            println!("Bye.");
            break;
        }

        if let Some(rest) = line.strip_prefix('/') {
            handle_command(rest, &state, &run_chat, &run_manager).await;
            continue;
        }

        if let Err(e) = run_manager.handle_incoming(LOCAL_CHAT_ID, LOCAL_USER_ID, line).await {
            warn!(error = %e, "failed to queue message");
        }
    }
}

fn is_quit_command(line: &str) -> bool {
    matches!(line, "quit" | "exit" | "/quit" | "/exit")
}

async fn handle_command(rest: &str, state: &Arc<AppState>, run_chat: &Arc<CliRunChat>, run_manager: &Arc<Manager>) {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_ascii_lowercase();
    let arg = parts.next().unwrap_or("").trim();

    match name.as_str() {
        "whoami" => println!("chat_id={LOCAL_CHAT_ID} user_id={LOCAL_USER_ID}"),
        "running" => {
            let session = state.sessions.get(LOCAL_CHAT_ID).await;
            match (&session.state, &session.job_id) {
                (RunState::Idle, _) => println!("no run in progress"),
                (run_state, Some(job_id)) => println!("{run_state:?}: job {job_id}"),
                (run_state, None) => println!("{run_state:?}"),
            }
        }
        "stop" => {
            let reason = if arg.is_empty() { "stopped by operator" } else { arg };
            if let Err(e) = run_manager.hard_cancel(LOCAL_CHAT_ID, reason).await {
                warn!(error = %e, "hard cancel failed");
            }
            println!("cancelling the active run");
        }
        "context" => {
            let job_id = if arg.is_empty() || arg == "global" {
                state.sessions.get(LOCAL_CHAT_ID).await.job_id
            } else {
                Some(arg.to_string())
            };
            match job_id {
                None => println!("no job to show context for"),
                Some(job_id) => match job::tail_conversation(&state.runs_dir, &job_id, 20).await {
                    Ok(entries) => {
                        for entry in entries {
                            println!("{}: {}", entry.role, entry.text);
                        }
                    }
                    Err(e) => println!("failed to load context: {e}"),
                },
            }
        }
        "agents" => match state.registry.load_agents_from_goc(&state.base_dir, false).await {
            Ok(catalog) if catalog.agents.is_empty() => println!("no agents installed"),
            Ok(catalog) => {
                for agent in &catalog.agents {
                    println!("{} ({}) - {}", agent.id, agent.provider, if agent.enabled { "enabled" } else { "disabled" });
                }
            }
            Err(e) => println!("failed to load agents: {e}"),
        },
        "approve" | "deny" => handle_approval(&name, arg, state, run_chat).await,
        "help" => {
            println!("/whoami /running /stop [reason] /context [jobId|global] /agents /approve <jobId> /deny <jobId> /quit");
        }
        other => println!("unknown command: /{other} (try /help)"),
    }
}

async fn handle_approval(name: &str, arg: &str, state: &Arc<AppState>, run_chat: &Arc<CliRunChat>) {
    let job_id = arg.trim();
    if job_id.is_empty() {
        println!("usage: /{name} <jobId>");
        return;
    }
    let session = state.sessions.get(LOCAL_CHAT_ID).await;
    let Some(pending) = session.pending_approval else {
        println!("no action awaiting approval");
        return;
    };
    if pending.job_id != job_id {
        println!("no pending approval for job {job_id} (pending job is {})", pending.job_id);
        return;
    }

    if name == "deny" {
        if let Err(e) = state
            .sessions
            .upsert(LOCAL_CHAT_ID, |s| {
                s.pending_approval = None;
                s.state = RunState::Idle;
            })
            .await
        {
            warn!(error = %e, "failed to clear denied approval");
        }
        println!("denied");
        return;
    }

    if let Err(e) = run_chat
        .resume_approved(LOCAL_CHAT_ID, &pending.requested_by, job_id, pending.remaining_actions.clone())
        .await
    {
        println!("failed to resume: {e}");
    }
}
