//! Defensive normalization of untyped action records into typed [`Action`]s.
//!
//! The planner LLM (and any deterministic fallback) emits loosely-shaped JSON: field names
//! vary (`agent`/`agent_id`/`agentId`), numeric fields arrive as strings or out-of-range
//! numbers, and the `type` tag itself has synonyms across planner versions. This module is the
//! single place that absorbs that variance; everything downstream consumes only canonical
//! [`Action`] variants.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use super::types::{
    Action, ContextScope, DraftProfile, FinalResponseStyle, InterruptMode, Risk, StatusDetail,
};

fn type_synonyms() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("run_agent", "run_agent"),
            ("agent_run", "run_agent"),
            ("run", "run_agent"),
            ("propose_agent", "propose_agent"),
            ("need_more_detail", "need_more_detail"),
            ("expand", "need_more_detail"),
            ("open_context", "open_context"),
            ("context", "open_context"),
            ("summarize", "summarize"),
            ("summary", "summarize"),
            ("search_public_agents", "search_public_agents"),
            ("search_agents", "search_public_agents"),
            ("install_agent_blueprint", "install_agent_blueprint"),
            ("install", "install_agent_blueprint"),
            ("publish_agent", "publish_agent"),
            ("publish", "publish_agent"),
            ("enable_agent", "enable_agent"),
            ("disable_agent", "disable_agent"),
            ("enable_tool", "enable_tool"),
            ("disable_tool", "disable_tool"),
            ("list_agents", "list_agents"),
            ("list_tools", "list_tools"),
            ("create_agent", "create_agent"),
            ("update_agent", "update_agent"),
            ("get_status", "get_status"),
            ("status", "get_status"),
            ("interrupt", "interrupt"),
            ("stop", "interrupt"),
            ("spawn_agents", "spawn_agents"),
            ("spawn", "spawn_agents"),
        ])
    })
}

fn clamp_u32(value: Option<&Value>, min: u32, max: u32, default: u32) -> u32 {
    let n = value
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .map(|n| n as u32)
        .unwrap_or(default);
    n.clamp(min, max)
}

fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Lowercases and trims an agent/tool id into a canonical slug.
pub fn normalize_slug(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn risk_field(value: &Value, default: Risk) -> Risk {
    match value.get("risk").and_then(Value::as_str) {
        Some("L0") | Some("l0") => Risk::L0,
        Some("L1") | Some("l1") => Risk::L1,
        Some("L2") | Some("l2") => Risk::L2,
        Some("L3") | Some("l3") => Risk::L3,
        _ => default,
    }
}

fn draft_profile(value: &Value) -> DraftProfile {
    DraftProfile {
        id: str_field(value, &["id", "agent_id", "agentId"]).map(|s| normalize_slug(&s)),
        name: str_field(value, &["name", "human_name"]),
        description: str_field(value, &["description"]),
        provider: str_field(value, &["provider"]),
        model: str_field(value, &["model"]),
        system_prompt: str_field(
            value,
            &["system_prompt", "prompt", "base_prompt", "systemPrompt"],
        ),
        metadata: value
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

/// Normalizes one untyped action record, returning `None` for an unrecognized or
/// mandatory-field-missing record (e.g. `run_agent` without both an agent id and a non-empty
/// goal).
pub fn normalize_action(value: &Value) -> Option<Action> {
    let raw_type = value.get("type").and_then(Value::as_str)?.trim().to_ascii_lowercase();
    let canonical = *type_synonyms().get(raw_type.as_str())?;

    match canonical {
        "run_agent" => {
            let agent_id = str_field(value, &["agent_id", "agent", "agentId"])
                .map(|s| normalize_slug(&s))?;
            let goal = str_field(value, &["goal", "prompt", "task"])?;
            Some(Action::RunAgent {
                agent_id,
                goal,
                inputs: value
                    .get("inputs")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                risk: risk_field(value, Risk::L1),
            })
        }
        "propose_agent" => Some(Action::ProposeAgent {
            draft: draft_profile(value),
            risk: risk_field(value, Risk::L2),
        }),
        "need_more_detail" => {
            let context_set_id = str_field(value, &["context_set_id", "contextSetId"])?;
            let node_ids = value
                .get("node_ids")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            Some(Action::NeedMoreDetail {
                context_set_id,
                node_ids,
                depth: clamp_u32(value.get("depth"), 1, 3, 1),
                max_chars: clamp_u32(value.get("max_chars"), 1200, 24000, 1200),
                risk: Risk::L0,
            })
        }
        "open_context" => {
            let scope = match value.get("scope").and_then(Value::as_str) {
                Some("global") => ContextScope::Global,
                _ => ContextScope::Current,
            };
            Some(Action::OpenContext {
                scope,
                risk: Risk::L0,
            })
        }
        "summarize" => Some(Action::Summarize {
            hint: str_field(value, &["hint"]).unwrap_or_default(),
            risk: Risk::L0,
        }),
        "search_public_agents" => {
            let query = str_field(value, &["query"])?;
            Some(Action::SearchPublicAgents {
                query,
                limit: clamp_u32(value.get("limit"), 1, 10, 5),
                risk: Risk::L0,
            })
        }
        "install_agent_blueprint" => {
            let blueprint_id = str_field(value, &["blueprint_id"])?;
            let public_node_id = str_field(value, &["public_node_id"])?;
            Some(Action::InstallAgentBlueprint {
                blueprint_id,
                public_node_id,
                agent_id_override: str_field(value, &["agent_id_override"])
                    .map(|s| normalize_slug(&s)),
                risk: Risk::L1,
            })
        }
        "publish_agent" => {
            let agent_node_id = str_field(value, &["agent_node_id"])?;
            let agent_id = str_field(value, &["agent_id"]).map(|s| normalize_slug(&s))?;
            Some(Action::PublishAgent {
                agent_node_id,
                agent_id,
                risk: Risk::L1,
            })
        }
        "enable_agent" => Some(Action::EnableAgent {
            agent_id: normalize_slug(&str_field(value, &["agent_id", "agent"])?),
        }),
        "disable_agent" => Some(Action::DisableAgent {
            agent_id: normalize_slug(&str_field(value, &["agent_id", "agent"])?),
        }),
        "enable_tool" => Some(Action::EnableTool {
            tool_id: normalize_slug(&str_field(value, &["tool_id", "tool"])?),
        }),
        "disable_tool" => Some(Action::DisableTool {
            tool_id: normalize_slug(&str_field(value, &["tool_id", "tool"])?),
        }),
        "list_agents" => Some(Action::ListAgents {
            include_disabled: value
                .get("include_disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        "list_tools" => Some(Action::ListTools {
            include_disabled: value
                .get("include_disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        "create_agent" => Some(Action::CreateAgent {
            profile: draft_profile(value.get("profile").unwrap_or(value)),
            format: str_field(value, &["format"]).unwrap_or_else(|| "json".to_string()),
        }),
        "update_agent" => {
            let agent_id = normalize_slug(&str_field(value, &["agent_id"])?);
            Some(Action::UpdateAgent {
                agent_id,
                patch: value
                    .get("patch")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
                format: str_field(value, &["format"]).unwrap_or_else(|| "json".to_string()),
            })
        }
        "get_status" => {
            let detail = match value.get("detail").and_then(Value::as_str) {
                Some("full") => StatusDetail::Full,
                _ => StatusDetail::Summary,
            };
            Some(Action::GetStatus { detail })
        }
        "interrupt" => {
            let mode = match value.get("mode").and_then(Value::as_str) {
                Some("cancel") => InterruptMode::Cancel,
                _ => InterruptMode::Replan,
            };
            Some(Action::Interrupt {
                mode,
                note: str_field(value, &["note"]).unwrap_or_default(),
            })
        }
        "spawn_agents" => {
            let agents: Vec<String> = value
                .get("agents")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str().map(|s| normalize_slug(s)))
                        .take(8)
                        .collect()
                })
                .unwrap_or_default();
            Some(Action::SpawnAgents {
                summary: str_field(value, &["summary"]).unwrap_or_default(),
                agents,
                max_parallel: clamp_u32(value.get("max_parallel"), 1, 8, 1),
            })
        }
        _ => None,
    }
}

/// Normalizes a raw plan: normalizes each action, drops nulls, truncates to `max_actions`.
/// Preserves `reason` and `final_response_style`; order is preserved.
pub fn normalize_action_plan(raw: &Value, max_actions: usize) -> ActionPlanDraft {
    let reason = raw
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let final_response_style = match raw.get("final_response_style").and_then(Value::as_str) {
        Some("detailed") => FinalResponseStyle::Detailed,
        _ => FinalResponseStyle::Concise,
    };
    let actions = raw
        .get("actions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(normalize_action)
                .take(max_actions)
                .collect()
        })
        .unwrap_or_default();
    ActionPlanDraft {
        reason,
        actions,
        final_response_style,
    }
}

/// Result of [`normalize_action_plan`]; converts losslessly into [`super::types::ActionPlan`].
pub struct ActionPlanDraft {
    pub reason: String,
    pub actions: Vec<Action>,
    pub final_response_style: FinalResponseStyle,
}

impl From<ActionPlanDraft> for super::types::ActionPlan {
    fn from(draft: ActionPlanDraft) -> Self {
        super::types::ActionPlan {
            reason: draft.reason,
            actions: draft.actions,
            final_response_style: draft.final_response_style,
        }
    }
}
