//! Allowlist: which action-type tags a job config permits.

use std::collections::HashSet;

use super::types::Action;

/// The default allowlist: every action tag the action model defines. A job's effective
/// allowlist is this set intersected with `allow_actions` plus any tag a declared tool
/// contributes via its `action_types`.
pub const DEFAULT_ACTION_TAGS: &[&str] = &[
    "run_agent",
    "propose_agent",
    "need_more_detail",
    "open_context",
    "summarize",
    "search_public_agents",
    "install_agent_blueprint",
    "publish_agent",
    "enable_agent",
    "disable_agent",
    "enable_tool",
    "disable_tool",
    "list_agents",
    "list_tools",
    "create_agent",
    "update_agent",
    "get_status",
    "interrupt",
    "spawn_agents",
];

/// Builds the effective allowlist: a job's `allow_actions` set, intersected with the action
/// model's known tags, unioned with any tags contributed by tool declarations.
pub fn effective_allowlist(
    allow_actions: &HashSet<String>,
    tool_declared_action_types: &[String],
) -> HashSet<String> {
    let mut set: HashSet<String> = DEFAULT_ACTION_TAGS
        .iter()
        .map(|s| s.to_string())
        .filter(|tag| allow_actions.is_empty() || allow_actions.contains(tag))
        .collect();
    set.extend(tool_declared_action_types.iter().cloned());
    set
}

/// `false` for an action whose tag is empty or not present in `allowlist`.
pub fn is_action_allowed(action: &Action, allowlist: &HashSet<String>) -> bool {
    let kind = action.kind();
    !kind.is_empty() && allowlist.contains(kind)
}
