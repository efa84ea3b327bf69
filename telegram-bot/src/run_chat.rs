//! [`RunChatCallback`] tying the planner and executor together for one merged chat message
//! (spec §4.7 "route -> execute -> render -> persist").

use std::collections::HashSet;
use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use supervisor_core::action::{effective_allowlist, Action, ActionPlan};
use supervisor_core::executor::{execute_plan, ActionContext, ExecutionOutcome, ExecutorError, ResultStatus};
use supervisor_core::job;
use supervisor_core::planner::{route, ChatProvider, RouterContext};
use supervisor_core::registry::provider_from_key;
use supervisor_core::run_manager::{RunChatCallback, RunChatInput, RunManagerError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::action_callbacks::BotActionCallbacks;
use crate::approvals;
use crate::state::AppState;

const DEFAULT_MAX_ACTIONS: u32 = 4;
const CONTEXT_SUMMARY_TAIL: usize = 6;

pub struct SupervisorRunChat {
    state: Arc<AppState>,
    callbacks: Arc<BotActionCallbacks>,
    chat_provider: Arc<dyn ChatProvider>,
}

impl SupervisorRunChat {
    pub fn new(state: Arc<AppState>, callbacks: Arc<BotActionCallbacks>, chat_provider: Arc<dyn ChatProvider>) -> Self {
        SupervisorRunChat { state, callbacks, chat_provider }
    }

    async fn ensure_job(&self, chat_id: &str, user_id: &str, goal_hint: &str) -> Result<String, RunManagerError> {
        let session = self.state.sessions.get(chat_id).await;
        let job_id = match session.job_id {
            Some(id) => id,
            None => {
                let title: String = goal_hint.chars().take(80).collect();
                let meta = job::create_job(&self.state.runs_dir, &title, user_id, chat_id)
                    .await
                    .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;
                job::tracking::init(&self.state.runs_dir.join(&meta.job_id), &[])
                    .await
                    .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;
                self.state
                    .sessions
                    .upsert(chat_id, |s| s.job_id = Some(meta.job_id.clone()))
                    .await?;
                meta.job_id
            }
        };
        Ok(job_id)
    }

    async fn build_router_context(&self, job_id: &str) -> Result<RouterContext, RunManagerError> {
        let catalog = self
            .state
            .registry
            .load_agents_from_goc(&self.state.base_dir, false)
            .await
            .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;

        let job_dir = self.state.runs_dir.join(job_id);
        let mapping = self
            .state
            .goc
            .ensure_job_thread(&job_dir, job_id)
            .await
            .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;

        let tail = job::tail_conversation(&self.state.runs_dir, job_id, CONTEXT_SUMMARY_TAIL)
            .await
            .unwrap_or_default();
        let context_summary = tail
            .iter()
            .map(|entry| format!("{}: {}", entry.role, entry.text))
            .collect::<Vec<_>>()
            .join("\n");

        let job_config = self.state.job_config.read().await.clone();

        Ok(RouterContext {
            agents: catalog.agents,
            tools: Vec::new(),
            job_config,
            current_job_id: Some(job_id.to_string()),
            current_context_set_id: mapping.shared_context_set_id,
            locale: "en".to_string(),
            router_policy: String::new(),
            context_summary,
        })
    }

    /// Resumes a plan an operator just approved via the inline keyboard. `remaining_actions[0]`
    /// is the action that triggered the approval gate and is dispatched without re-checking it;
    /// every later action in `remaining_actions` is still gated normally.
    pub async fn resume_approved(
        &self,
        chat_id: &str,
        user_id: &str,
        job_id: &str,
        remaining_actions: Vec<Action>,
    ) -> Result<(), RunManagerError> {
        let ctx = self.build_router_context(job_id).await?;
        let allow_actions: HashSet<String> = ctx.job_config.allow_actions.clone().unwrap_or_default().into_iter().collect();
        let tool_action_types: Vec<String> = ctx.tools.iter().flat_map(|t| t.declared_action_types.clone()).collect();
        let allowlist = effective_allowlist(&allow_actions, &tool_action_types);

        let by_id = ctx
            .agents
            .iter()
            .map(|a| (a.id.clone(), a.provider.clone()))
            .collect::<std::collections::HashMap<_, _>>();
        let resolve_provider = move |agent_id: &str| by_id.get(agent_id).map(|p| provider_from_key(p));

        let plan = ActionPlan {
            reason: "resumed after approval".to_string(),
            actions: remaining_actions,
            final_response_style: supervisor_core::action::FinalResponseStyle::Concise,
        };
        let action_ctx = ActionContext { chat_id: chat_id.to_string(), user_id: user_id.to_string(), job_id: job_id.to_string() };

        let outcome = execute_plan(
            self.callbacks.as_ref(),
            action_ctx,
            plan.clone(),
            &allowlist,
            &self.state.approval,
            &resolve_provider,
            &self.state.sessions,
            true,
        )
        .await
        .map_err(map_executor_error)?;

        let summary = Self::render_summary(&plan, &outcome);

        job::append_conversation(&self.state.runs_dir, job_id, "agent", &summary, serde_json::Value::Null)
            .await
            .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;

        let job_dir = self.state.runs_dir.join(job_id);
        if let Err(e) = job::tracking::append(&job_dir, "progress.md", &summary, chrono::Utc::now(), Some(&self.state.goc)).await {
            warn!(job_id, error = %e, "failed to append progress tracking doc");
        }

        let Ok(telegram_chat_id) = chat_id.parse::<i64>() else {
            return Err(RunManagerError::RunFailed(format!("chat id {chat_id} is not a telegram chat id")));
        };

        if let Some(pending) = &outcome.pending_approval {
            if let Err(e) = approvals::save(&self.state.runs_dir, pending).await {
                warn!(job_id, error = %e, "failed to persist pending approval token");
            }
            let keyboard = approvals::keyboard(job_id, &pending.id);
            if let Err(e) = self.state.bot.send_message(ChatId(telegram_chat_id), &summary).reply_markup(keyboard).await {
                warn!(job_id, error = %e, "failed to send approval prompt");
            }
        } else if let Err(e) = self.state.bot.send_message(ChatId(telegram_chat_id), &summary).await {
            warn!(job_id, error = %e, "failed to send run summary");
        }

        Ok(())
    }

    fn render_summary(plan: &ActionPlan, outcome: &ExecutionOutcome) -> String {
        let mut lines = vec![format!("plan: {}", plan.reason)];
        for result in &outcome.results {
            let marker = match result.status {
                ResultStatus::Ok => "ok",
                ResultStatus::Skip => "skip",
                ResultStatus::Blocked => "blocked",
                ResultStatus::Error => "error",
            };
            lines.push(format!("- [{marker}] {}: {}", result.label, result.note));
        }
        for output in &outcome.outputs {
            if !output.text.is_empty() {
                lines.push(output.text.clone());
            }
        }
        if let Some(pending) = &outcome.pending_approval {
            lines.push(format!("awaiting approval: {}", describe_action(&pending.action)));
        }
        lines.join("\n")
    }
}

fn describe_action(action: &Action) -> String {
    match action {
        Action::RunAgent { agent_id, goal, .. } => format!("run_agent {agent_id}: {goal}"),
        other => other.kind().to_string(),
    }
}

#[async_trait]
impl RunChatCallback for SupervisorRunChat {
    async fn run_chat(&self, input: RunChatInput, cancel: &CancellationToken) -> Result<(), RunManagerError> {
        let job_id = self.ensure_job(&input.chat_id, &input.user_id, &input.message).await?;
        let ctx = self.build_router_context(&job_id).await?;

        job::append_conversation(&self.state.runs_dir, &job_id, "user", &input.message, serde_json::Value::Null)
            .await
            .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;

        let plan = route(self.chat_provider.as_ref(), &input.message, &ctx, cancel)
            .await
            .map_err(|e| if e.is_cancelled() { RunManagerError::Cancelled } else { RunManagerError::RunFailed(e.to_string()) })?;

        let max_actions = ctx.job_config.max_actions.unwrap_or(DEFAULT_MAX_ACTIONS);
        self.state
            .sessions
            .upsert(&input.chat_id, |s| {
                if s.budget.max_actions == 0 {
                    s.budget.max_actions = max_actions;
                }
                s.state = supervisor_core::session::RunState::Executing;
            })
            .await?;

        let allow_actions: HashSet<String> = ctx
            .job_config
            .allow_actions
            .clone()
            .unwrap_or_default()
            .into_iter()
            .collect();
        let tool_action_types: Vec<String> = ctx.tools.iter().flat_map(|t| t.declared_action_types.clone()).collect();
        let allowlist = effective_allowlist(&allow_actions, &tool_action_types);

        let by_id = ctx
            .agents
            .iter()
            .map(|a| (a.id.clone(), a.provider.clone()))
            .collect::<std::collections::HashMap<_, _>>();
        let resolve_provider = move |agent_id: &str| by_id.get(agent_id).map(|p| provider_from_key(p));

        let action_ctx = ActionContext { chat_id: input.chat_id.clone(), user_id: input.user_id.clone(), job_id: job_id.clone() };

        let outcome = execute_plan(
            self.callbacks.as_ref(),
            action_ctx,
            plan.clone(),
            &allowlist,
            &self.state.approval,
            &resolve_provider,
            &self.state.sessions,
            false,
        )
        .await
        .map_err(map_executor_error)?;

        let summary = Self::render_summary(&plan, &outcome);

        job::append_conversation(&self.state.runs_dir, &job_id, "agent", &summary, serde_json::Value::Null)
            .await
            .map_err(|e| RunManagerError::RunFailed(e.to_string()))?;

        let job_dir = self.state.runs_dir.join(&job_id);
        if let Err(e) = job::tracking::append(&job_dir, "progress.md", &summary, chrono::Utc::now(), Some(&self.state.goc)).await {
            warn!(job_id, error = %e, "failed to append progress tracking doc");
        }

        let Ok(telegram_chat_id) = input.chat_id.parse::<i64>() else {
            return Err(RunManagerError::RunFailed(format!("chat id {} is not a telegram chat id", input.chat_id)));
        };

        if let Some(pending) = &outcome.pending_approval {
            if let Err(e) = approvals::save(&self.state.runs_dir, pending).await {
                warn!(job_id, error = %e, "failed to persist pending approval token");
            }
            let keyboard = approvals::keyboard(&job_id, &pending.id);
            if let Err(e) = self
                .state
                .bot
                .send_message(ChatId(telegram_chat_id), &summary)
                .reply_markup(keyboard)
                .await
            {
                warn!(job_id, error = %e, "failed to send approval prompt");
            }
        } else if let Err(e) = self.state.bot.send_message(ChatId(telegram_chat_id), &summary).await {
            warn!(job_id, error = %e, "failed to send run summary");
        }

        Ok(())
    }
}

fn map_executor_error(e: ExecutorError) -> RunManagerError {
    if e.is_cancelled() {
        RunManagerError::Cancelled
    } else {
        RunManagerError::RunFailed(e.to_string())
    }
}
