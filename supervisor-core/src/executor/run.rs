//! The eight-step action walk (spec §4.7).

use std::collections::HashSet;

use crate::action::{action_needs_approval, Action, ActionPlan, ApprovalConfig, InterruptMode, ProviderResolver};
use crate::session::{ChatSession, Interrupt, PendingApproval, RunState, SessionStore};

use super::callbacks::{ActionCallbacks, ActionContext};
use super::error::ExecutorError;
use super::types::{ActionOutput, ActionResult, ExecutionOutcome};

/// Runs `plan` to completion, to an interrupt, or to the next approval gate.
///
/// `pre_approved_first` marks `plan.actions[0]` as already cleared by an operator (e.g. a
/// resumption of a plan's `remaining_actions` after an approve callback) so it skips straight to
/// dispatch instead of re-triggering [`action_needs_approval`]. Every later action in the plan is
/// still checked normally.
pub async fn execute_plan(
    callbacks: &dyn ActionCallbacks,
    ctx: ActionContext,
    plan: ActionPlan,
    allowlist: &HashSet<String>,
    approval: &ApprovalConfig,
    resolve_provider: &ProviderResolver<'_>,
    sessions: &SessionStore,
    pre_approved_first: bool,
) -> Result<ExecutionOutcome, ExecutorError> {
    let mut outcome = ExecutionOutcome::empty();
    let mut used_actions = sessions.get(&ctx.chat_id).await.budget.used_actions;
    let max_actions = sessions.get(&ctx.chat_id).await.budget.max_actions;
    let mut interrupted_by_replan = false;

    for (index, action) in plan.actions.iter().enumerate() {
        if let Some(stop) = poll_interrupt(sessions, &ctx.chat_id, &mut outcome).await? {
            if stop {
                interrupted_by_replan = true;
                outcome.blocked_index = Some(index);
                outcome.remaining_actions = plan.actions[index..].to_vec();
            }
            break;
        }

        if !allowlist.contains(action.kind()) {
            outcome
                .results
                .push(ActionResult::blocked(action.kind(), "blocked: not in allowlist"));
            continue;
        }

        if used_actions >= max_actions {
            outcome
                .results
                .push(ActionResult::blocked(action.kind(), "blocked: budget exceeded"));
            outcome.blocked_index = Some(index);
            outcome.remaining_actions = plan.actions[index..].to_vec();
            break;
        }

        let pre_approved = pre_approved_first && index == 0;
        if action_needs_approval(action, approval, resolve_provider, pre_approved) {
            let pending = PendingApproval {
                id: uuid::Uuid::new_v4().to_string(),
                chat_id: ctx.chat_id.clone(),
                job_id: ctx.job_id.clone(),
                action: action.clone(),
                reason: "risk threshold or file-write policy".to_string(),
                blocked_index: index,
                remaining_actions: plan.actions[index + 1..].to_vec(),
                already_done: serde_json::to_value(&outcome.results).unwrap_or(serde_json::Value::Null),
                requested_by: ctx.user_id.clone(),
                ts: chrono::Utc::now(),
            };
            outcome.pending_approval = Some(pending.clone());
            outcome.blocked_index = Some(index);
            outcome.remaining_actions = plan.actions[index..].to_vec();
            sessions
                .upsert(&ctx.chat_id, |s| {
                    s.state = RunState::AwaitingApproval;
                    s.pending_approval = Some(pending.clone());
                })
                .await?;
            return Ok(outcome);
        }

        let dispatch_result = dispatch(callbacks, &ctx, action).await;
        match dispatch_result {
            Ok(output) => {
                outcome
                    .results
                    .push(ActionResult::ok(action.kind(), "dispatched"));
                outcome.outputs.push(output);
                used_actions += 1;
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                outcome
                    .results
                    .push(ActionResult::error(action.kind(), e.to_string()));
            }
        }

        if let Some(stop) = poll_interrupt(sessions, &ctx.chat_id, &mut outcome).await? {
            if stop {
                interrupted_by_replan = true;
                outcome.blocked_index = Some(index + 1);
                outcome.remaining_actions = plan.actions[index + 1..].to_vec();
            }
            break;
        }

        if action.is_selection_update() {
            outcome
                .results
                .push(ActionResult::skip("selection_update", "takes effect next turn"));
            break;
        }

        if matches!(action, Action::Interrupt { .. }) {
            break;
        }
    }

    let final_state = if outcome.pending_approval.is_some() {
        RunState::AwaitingApproval
    } else if interrupted_by_replan {
        RunState::Idle
    } else {
        RunState::Done
    };

    sessions
        .upsert(&ctx.chat_id, |s: &mut ChatSession| {
            s.state = final_state;
            s.interrupt = None;
            s.budget.used_actions = used_actions;
        })
        .await?;

    Ok(outcome)
}

/// Returns `Ok(None)` to continue, `Ok(Some(false))` ... unused; `Ok(Some(true))` to break with
/// a replan-interrupt marker recorded, or `Err` for a cancel-shaped interrupt.
async fn poll_interrupt(
    sessions: &SessionStore,
    chat_id: &str,
    outcome: &mut ExecutionOutcome,
) -> Result<Option<bool>, ExecutorError> {
    let session = sessions.get(chat_id).await;
    match session.interrupt {
        Some(Interrupt { requested: true, mode: InterruptMode::Cancel, .. }) => Err(ExecutorError::Cancelled),
        Some(Interrupt { requested: true, mode: InterruptMode::Replan, .. }) => {
            outcome
                .results
                .push(ActionResult::skip("interrupt", "replan requested, stopping plan"));
            Ok(Some(true))
        }
        _ => Ok(None),
    }
}

async fn dispatch(
    callbacks: &dyn ActionCallbacks,
    ctx: &ActionContext,
    action: &Action,
) -> Result<ActionOutput, ExecutorError> {
    match action {
        Action::RunAgent { agent_id, goal, inputs, .. } => {
            callbacks.run_agent(ctx, agent_id, goal, inputs).await
        }
        Action::ProposeAgent { draft, .. } => callbacks.propose_agent(ctx, draft).await,
        Action::NeedMoreDetail { context_set_id, node_ids, depth, max_chars, .. } => {
            callbacks
                .need_more_detail(ctx, context_set_id, node_ids, *depth, *max_chars)
                .await
        }
        Action::OpenContext { scope, .. } => callbacks.open_context(ctx, *scope).await,
        Action::Summarize { hint, .. } => callbacks.summarize(ctx, hint).await,
        Action::SearchPublicAgents { query, limit, .. } => {
            callbacks.search_public_agents(ctx, query, *limit).await
        }
        Action::InstallAgentBlueprint { blueprint_id, public_node_id, agent_id_override, .. } => {
            callbacks
                .install_agent_blueprint(ctx, blueprint_id, public_node_id, agent_id_override.as_deref())
                .await
        }
        Action::PublishAgent { agent_node_id, agent_id, .. } => {
            callbacks.publish_agent(ctx, agent_node_id, agent_id).await
        }
        Action::EnableAgent { agent_id } => callbacks.enable_agent(ctx, agent_id).await,
        Action::DisableAgent { agent_id } => callbacks.disable_agent(ctx, agent_id).await,
        Action::EnableTool { tool_id } => callbacks.enable_tool(ctx, tool_id).await,
        Action::DisableTool { tool_id } => callbacks.disable_tool(ctx, tool_id).await,
        Action::ListAgents { include_disabled } => callbacks.list_agents(ctx, *include_disabled).await,
        Action::ListTools { include_disabled } => callbacks.list_tools(ctx, *include_disabled).await,
        Action::CreateAgent { profile, format } => callbacks.create_agent(ctx, profile, format).await,
        Action::UpdateAgent { agent_id, patch, format } => {
            callbacks.update_agent(ctx, agent_id, patch, format).await
        }
        Action::GetStatus { detail } => callbacks.get_status(ctx, *detail).await,
        Action::Interrupt { mode, note } => callbacks.interrupt(ctx, *mode, note).await,
        Action::SpawnAgents { summary, agents, max_parallel } => {
            callbacks.spawn_agents(ctx, summary, agents, *max_parallel).await
        }
    }
}
