//! Deterministic keyword-based classifier, used whenever the LLM call fails, returns non-ok,
//! or produces no plan with at least one valid action (spec §4.6). This is the behavioral
//! contract that lets the supervisor run end-to-end without a live model.

use crate::action::{Action, ActionPlan, ContextScope, FinalResponseStyle, Risk, StatusDetail};

use super::types::RouterContext;

struct Intent {
    tag: &'static str,
    keywords: &'static [&'static str],
}

const INTENTS: &[Intent] = &[
    Intent { tag: "list", keywords: &["list agents", "list tools", "show agents", "what agents"] },
    Intent { tag: "status", keywords: &["status", "how's it going", "progress"] },
    Intent { tag: "interrupt", keywords: &["stop", "cancel", "abort", "halt"] },
    Intent { tag: "open_context", keywords: &["show context", "open context", "what do you know"] },
    Intent { tag: "spawn", keywords: &["spawn", "run in parallel", "fan out"] },
    Intent { tag: "disable", keywords: &["disable", "turn off", "deactivate"] },
    Intent { tag: "enable", keywords: &["enable", "turn on", "activate"] },
    Intent { tag: "publish", keywords: &["publish"] },
    Intent { tag: "install", keywords: &["install"] },
    Intent { tag: "search", keywords: &["search agents", "find an agent", "search for agent"] },
    Intent { tag: "propose", keywords: &["propose", "suggest an agent"] },
    Intent { tag: "create", keywords: &["create agent", "new agent", "make an agent"] },
    Intent { tag: "update", keywords: &["update agent", "edit agent", "change agent"] },
    Intent { tag: "run", keywords: &["run", "do", "please", "can you", "help"] },
];

fn classify(message: &str) -> &'static str {
    let lower = message.to_ascii_lowercase();
    for intent in INTENTS {
        if intent.keywords.iter().any(|kw| lower.contains(kw)) {
            return intent.tag;
        }
    }
    "run"
}

/// Extracts agent ids mentioned as `@id` or `id:` tokens, lowercased, in order of first mention.
pub fn mentioned_agent_ids(message: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for token in message.split_whitespace() {
        let cleaned = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != ':' && c != '-' && c != '_');
        if let Some(rest) = cleaned.strip_prefix('@') {
            if !rest.is_empty() {
                ids.push(rest.to_ascii_lowercase());
            }
        } else if let Some((prefix, rest)) = cleaned.split_once(':') {
            if prefix.eq_ignore_ascii_case("id") && !rest.is_empty() {
                ids.push(rest.to_ascii_lowercase());
            }
        }
    }
    ids
}

/// Builds a minimal, always-valid plan by keyword intent alone, with no LLM involved.
pub fn fallback_plan(message: &str, ctx: &RouterContext) -> ActionPlan {
    let mentioned = mentioned_agent_ids(message);
    let intent = classify(message);

    let action = match intent {
        "list" => Action::ListAgents { include_disabled: false },
        "status" => Action::GetStatus { detail: StatusDetail::Summary },
        "interrupt" => Action::Interrupt {
            mode: crate::action::InterruptMode::Cancel,
            note: "user requested stop".to_string(),
        },
        "open_context" => Action::OpenContext { scope: ContextScope::Current, risk: Risk::L0 },
        "spawn" => Action::SpawnAgents {
            summary: message.to_string(),
            agents: if mentioned.is_empty() { ctx.agent_ids().into_iter().take(2).map(str::to_string).collect() } else { mentioned.clone() },
            max_parallel: 2,
        },
        "disable" => match mentioned.first() {
            Some(id) => Action::DisableAgent { agent_id: id.clone() },
            None => Action::GetStatus { detail: StatusDetail::Summary },
        },
        "enable" => match mentioned.first() {
            Some(id) => Action::EnableAgent { agent_id: id.clone() },
            None => Action::GetStatus { detail: StatusDetail::Summary },
        },
        "search" => Action::SearchPublicAgents { query: message.to_string(), limit: 5, risk: Risk::L0 },
        "propose" => Action::ProposeAgent {
            draft: crate::action::DraftProfile {
                id: mentioned.first().cloned(),
                ..Default::default()
            },
            risk: Risk::L2,
        },
        _ => {
            let agent_id = mentioned
                .first()
                .cloned()
                .or_else(|| ctx.agents.first().map(|a| a.id.clone()))
                .unwrap_or_else(|| "researcher".to_string());
            Action::RunAgent {
                agent_id,
                goal: message.to_string(),
                inputs: Default::default(),
                risk: Risk::L1,
            }
        }
    };

    ActionPlan {
        reason: format!("fallback classifier: intent={intent}"),
        actions: vec![action],
        final_response_style: FinalResponseStyle::Concise,
    }
}
