//! Approval gate: decides whether an action must be held for operator approval before dispatch.

use std::collections::HashSet;

use super::types::{Action, Provider, Risk};

/// A job's approval policy (spec §3 `JobConfig.approval`).
#[derive(Debug, Clone, Default)]
pub struct ApprovalConfig {
    pub require_for_risk: HashSet<Risk>,
    pub require_file_write: bool,
}

impl ApprovalConfig {
    /// Default policy: require approval for L3 only.
    pub fn default_policy() -> Self {
        ApprovalConfig {
            require_for_risk: [Risk::L3].into_iter().collect(),
            require_file_write: false,
        }
    }
}

/// Resolves which [`Provider`] an agent id maps to. Supplied by the caller (the agent
/// registry) rather than looked up here, so this module stays free of any store dependency.
pub type ProviderResolver<'a> = dyn Fn(&str) -> Option<Provider> + 'a;

/// `true` when `action` needs operator approval before the executor dispatches it.
///
/// Pre-approved actions (flagged by the caller, e.g. a re-submission of a previously approved
/// plan) always return `false`. Otherwise: approval is required if the action's risk is at
/// least as high as any configured `require_for_risk` level, or — when
/// `require_file_write` is set — the action is a `run_agent` whose resolved provider is
/// the code-writing provider ([`Provider::Coder`]).
pub fn action_needs_approval(
    action: &Action,
    approval: &ApprovalConfig,
    resolve_provider: &ProviderResolver,
    pre_approved: bool,
) -> bool {
    if pre_approved {
        return false;
    }

    let risk = action.risk();
    if approval
        .require_for_risk
        .iter()
        .any(|required| risk >= *required)
    {
        return true;
    }

    if approval.require_file_write {
        if let Action::RunAgent { agent_id, .. } = action {
            if resolve_provider(agent_id) == Some(Provider::Coder) {
                return true;
            }
        }
    }

    false
}
