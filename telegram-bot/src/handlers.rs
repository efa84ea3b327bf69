//! Update dispatch: slash commands, plain chat messages, and approve/deny callback queries
//! (spec §6 "Chat transport").

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::warn;

use supervisor_core::job;
use supervisor_core::run_manager::RunManager;
use supervisor_core::session::RunState;

use crate::ack::TelegramAck;
use crate::approvals;
use crate::commands::Command;
use crate::run_chat::SupervisorRunChat;
use crate::state::AppState;

type Manager = RunManager<SupervisorRunChat, TelegramAck>;

pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    run_manager: Arc<Manager>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else { return Ok(()) };
    let chat_id = msg.chat.id.0.to_string();
    let user_id = msg.from().map(|u| u.id.0.to_string()).unwrap_or_else(|| chat_id.clone());

    if let Ok(command) = Command::parse(text, "telegram-bot") {
        return handle_command(bot, msg.chat.id, &chat_id, &user_id, command, &state, &run_manager).await;
    }

    if let Err(e) = run_manager.handle_incoming(&chat_id, &user_id, text).await {
        warn!(chat_id, error = %e, "failed to queue incoming message");
    }
    Ok(())
}

async fn handle_command(
    bot: Bot,
    telegram_chat_id: ChatId,
    chat_id: &str,
    user_id: &str,
    command: Command,
    state: &Arc<AppState>,
    run_manager: &Arc<Manager>,
) -> ResponseResult<()> {
    match command {
        Command::Help => {
            bot.send_message(telegram_chat_id, Command::descriptions().to_string()).await?;
        }
        Command::WhoAmI => {
            bot.send_message(telegram_chat_id, format!("chat_id={chat_id} user_id={user_id}")).await?;
        }
        Command::Running => {
            let session = state.sessions.get(chat_id).await;
            let text = match (&session.state, &session.job_id) {
                (RunState::Idle, _) => "no run in progress".to_string(),
                (run_state, Some(job_id)) => format!("{run_state:?}: job {job_id}"),
                (run_state, None) => format!("{run_state:?}"),
            };
            bot.send_message(telegram_chat_id, text).await?;
        }
        Command::Stop(reason) => {
            let reason = if reason.is_empty() { "stopped by user" } else { reason.as_str() };
            if let Err(e) = run_manager.hard_cancel(chat_id, reason).await {
                warn!(chat_id, error = %e, "hard cancel failed");
            }
            bot.send_message(telegram_chat_id, "cancelling the active run").await?;
        }
        Command::Agents => {
            let catalog = state.registry.load_agents_from_goc(&state.base_dir, false).await;
            let text = match catalog {
                Ok(catalog) if catalog.agents.is_empty() => "no agents installed".to_string(),
                Ok(catalog) => catalog
                    .agents
                    .iter()
                    .map(|a| format!("{} ({}) - {}", a.id, a.provider, if a.enabled { "enabled" } else { "disabled" }))
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => format!("failed to load agents: {e}"),
            };
            bot.send_message(telegram_chat_id, text).await?;
        }
        Command::Context(job_id) => {
            let job_id = if job_id.trim().is_empty() || job_id == "global" {
                state.sessions.get(chat_id).await.job_id
            } else {
                Some(job_id)
            };
            let text = match job_id {
                None => "no job to show context for".to_string(),
                Some(job_id) => match job::tail_conversation(&state.runs_dir, &job_id, 20).await {
                    Ok(entries) => entries.iter().map(|e| format!("{}: {}", e.role, e.text)).collect::<Vec<_>>().join("\n"),
                    Err(e) => format!("failed to load context: {e}"),
                },
            };
            bot.send_message(telegram_chat_id, text).await?;
        }
        Command::Run(goal) | Command::Chat(goal) => {
            if goal.trim().is_empty() {
                bot.send_message(telegram_chat_id, "usage: /run <goal>").await?;
            } else if let Err(e) = run_manager.handle_incoming(chat_id, user_id, &goal).await {
                warn!(chat_id, error = %e, "failed to queue run");
            }
        }
        Command::Continue(job_id) => {
            if !job_id.trim().is_empty() {
                state.sessions.upsert(chat_id, |s| s.job_id = Some(job_id.clone())).await.ok();
            }
            bot.send_message(telegram_chat_id, "send your next message to continue this job").await?;
        }
        Command::Commit(rest) => {
            let Some((job_id, note)) = rest.split_once(' ') else {
                bot.send_message(telegram_chat_id, "usage: /commit <jobId> <note>").await?;
                return Ok(());
            };
            let job_dir = state.runs_dir.join(job_id);
            let result = job::tracking::append(&job_dir, "decisions.md", note, chrono::Utc::now(), Some(&state.goc)).await;
            let text = match result {
                Ok(()) => "noted".to_string(),
                Err(e) => format!("failed to commit note: {e}"),
            };
            bot.send_message(telegram_chat_id, text).await?;
        }
        Command::GptPrompt(rest) => {
            let Some((job_id, question)) = rest.split_once(' ') else {
                bot.send_message(telegram_chat_id, "usage: /gptprompt <jobId> <question>").await?;
                return Ok(());
            };
            let job_dir = state.runs_dir.join(job_id);
            if let Err(e) = job::tracking::append(&job_dir, "research.md", question, chrono::Utc::now(), Some(&state.goc)).await {
                warn!(job_id, error = %e, "failed to record gptprompt draft");
            }
            bot.send_message(telegram_chat_id, "drafted, paste the reply back with /gptapply").await?;
        }
        Command::GptApply(job_id) => {
            bot.send_message(telegram_chat_id, format!("apply reply for job {job_id} manually via the next message")).await?;
        }
        Command::GptDone => {
            bot.send_message(telegram_chat_id, "gpt round-trip marked done").await?;
        }
        Command::Memory(_) | Command::Settings(_) => {
            bot.send_message(telegram_chat_id, "not supported yet").await?;
        }
    }
    Ok(())
}

pub async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
    run_chat: Arc<SupervisorRunChat>,
) -> ResponseResult<()> {
    let Some(data) = q.data.as_deref() else { return Ok(()) };
    let Some((approve, job_id, token)) = approvals::parse_callback_data(data) else { return Ok(()) };

    bot.answer_callback_query(q.id.clone()).await?;

    let pending = match approvals::load(&state.runs_dir, job_id, token).await {
        Ok(pending) => pending,
        Err(e) => {
            warn!(job_id, token, error = %e, "approval token missing or unreadable");
            return Ok(());
        }
    };
    approvals::remove(&state.runs_dir, job_id, token).await;

    use teloxide::types::MaybeInaccessibleMessage;
    let telegram_chat_id = match q.message {
        Some(MaybeInaccessibleMessage::Regular(message)) => message.chat.id,
        Some(MaybeInaccessibleMessage::Inaccessible(message)) => message.chat.id,
        None => return Ok(()),
    };

    if !approve {
        state
            .sessions
            .upsert(&pending.chat_id, |s| {
                s.pending_approval = None;
                s.state = RunState::Idle;
            })
            .await
            .ok();
        bot.send_message(telegram_chat_id, "denied").await?;
        return Ok(());
    }

    if let Err(e) = run_chat
        .resume_approved(&pending.chat_id, &pending.requested_by, job_id, pending.remaining_actions.clone())
        .await
    {
        warn!(job_id, error = %e, "failed to resume approved plan");
        bot.send_message(telegram_chat_id, format!("failed to resume: {e}")).await?;
    }
    Ok(())
}
