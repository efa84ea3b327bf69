//! Composes the structured routing prompt (spec §4.6): allowed action schema, agent/tool
//! catalog, and a small set of hard rules.

use super::types::RouterContext;

const HARD_RULES: &[&str] = &[
    "Emit only one JSON object, no prose outside it.",
    "Prefer a single run_agent action for simple requests.",
    "Only use the planner provider when the user explicitly asked for it.",
    "Raise risk to L3 for any run_agent that writes files.",
];

pub fn compose_prompt(user_message: &str, ctx: &RouterContext) -> String {
    let mut out = String::new();
    out.push_str("You are the routing layer for a multi-agent supervisor.\n\n");
    out.push_str("Allowed action types: run_agent, propose_agent, need_more_detail, open_context, ");
    out.push_str("summarize, search_public_agents, install_agent_blueprint, publish_agent, ");
    out.push_str("enable_agent, disable_agent, enable_tool, disable_tool, list_agents, list_tools, ");
    out.push_str("create_agent, update_agent, get_status, interrupt, spawn_agents.\n\n");

    out.push_str("Rules:\n");
    for rule in HARD_RULES {
        out.push_str("- ");
        out.push_str(rule);
        out.push('\n');
    }
    out.push('\n');

    out.push_str("Agents:\n");
    for agent in &ctx.agents {
        out.push_str(&format!("- {} ({}): {}\n", agent.id, agent.provider, agent.description));
    }
    out.push('\n');

    out.push_str("Tools:\n");
    for tool in &ctx.tools {
        out.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }
    out.push('\n');

    if !ctx.context_summary.is_empty() {
        out.push_str("Context summary:\n");
        out.push_str(&ctx.context_summary);
        out.push_str("\n\n");
    }

    if !ctx.router_policy.is_empty() {
        out.push_str("Router policy:\n");
        out.push_str(&ctx.router_policy);
        out.push_str("\n\n");
    }

    out.push_str(&format!("Locale: {}\n\n", ctx.locale));
    out.push_str("User message:\n");
    out.push_str(user_message);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JobConfig;

    fn empty_ctx() -> RouterContext {
        RouterContext {
            agents: Vec::new(),
            tools: Vec::new(),
            job_config: JobConfig::default(),
            current_job_id: None,
            current_context_set_id: None,
            locale: "en".to_string(),
            router_policy: String::new(),
            context_summary: String::new(),
        }
    }

    #[test]
    fn prompt_includes_user_message_and_rules() {
        let prompt = compose_prompt("list my agents", &empty_ctx());
        assert!(prompt.contains("list my agents"));
        assert!(prompt.contains("single run_agent"));
        assert!(prompt.contains("Locale: en"));
    }
}
