//! Top-level planner entry point: compose prompt, call the provider, extract + normalize the
//! plan, post-process, or fall back to the deterministic classifier (spec §4.6).

use tokio_util::sync::CancellationToken;

use crate::action::{normalize_action_plan, ActionPlan};

use super::error::PlannerError;
use super::extract::extract_json_object;
use super::fallback::fallback_plan;
use super::postprocess::postprocess;
use super::prompt::compose_prompt;
use super::provider::ChatProvider;
use super::types::RouterContext;

const MAX_ACTIONS: usize = 6;

/// Routes one user message to a normalized [`ActionPlan`]. Always returns a usable plan — the
/// deterministic fallback is the backstop, not a failure mode.
pub async fn route(
    provider: &dyn ChatProvider,
    user_message: &str,
    ctx: &RouterContext,
    cancel: &CancellationToken,
) -> Result<ActionPlan, PlannerError> {
    if cancel.is_cancelled() {
        return Err(PlannerError::Cancelled);
    }

    let prompt = compose_prompt(user_message, ctx);
    let raw = tokio::select! {
        result = provider.complete(&prompt) => result.ok(),
        _ = cancel.cancelled() => return Err(PlannerError::Cancelled),
    };

    let plan = raw
        .as_deref()
        .and_then(extract_json_object)
        .map(|v| normalize_action_plan(&v, MAX_ACTIONS).into())
        .filter(|p: &ActionPlan| !p.actions.is_empty())
        .unwrap_or_else(|| fallback_plan(user_message, ctx));

    Ok(postprocess(plan, user_message, ctx))
}
