//! Normalizes loosely-shaped JSON/YAML-subset values into [`AgentProfile`]s, accepting the
//! field aliases real operator-authored profiles use (spec §4.5).

use serde_json::Value;

use super::types::AgentProfile;
use super::yaml_subset::parse_json_or_yaml_subset;

fn str_alias(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = value.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

/// Builds an [`AgentProfile`] from a payload object, accepting the canonical field aliases.
/// Returns `None` if no id can be resolved.
pub fn profile_from_value(value: &Value) -> Option<AgentProfile> {
    let id = str_alias(value, &["id", "agent_id", "agentId"])?;
    let name = str_alias(value, &["name", "title"]).unwrap_or_else(|| id.clone());
    let description = str_alias(value, &["description", "desc", "summary"]).unwrap_or_default();
    let provider = str_alias(value, &["provider", "provider_key"]).unwrap_or_default();
    let model = str_alias(value, &["model", "model_name"]).unwrap_or_default();
    let system_prompt =
        str_alias(value, &["prompt", "base_prompt", "system_prompt", "systemPrompt"]).unwrap_or_default();
    let tools = value
        .get("tools")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let enabled = value.get("enabled").and_then(Value::as_bool).unwrap_or(true);

    Some(AgentProfile {
        id: crate::action::normalize_slug(&id),
        name,
        description,
        provider,
        model,
        system_prompt,
        tools,
        enabled,
        origin: None,
        metadata: Default::default(),
    })
}

/// Tries payload-first decode (§4.5 step 3a), then fenced JSON/YAML blocks in raw text (3b),
/// then the whole raw text as one document (3c).
pub fn decode_profile_from_resource(payload: &Value, raw_text: &str) -> Option<AgentProfile> {
    for key in ["agent_profile", "agent", "profile"] {
        if let Some(nested) = payload.get(key) {
            if let Some(p) = profile_from_value(nested) {
                return Some(p);
            }
        }
    }
    if payload.is_object() && !payload.as_object().map(|m| m.is_empty()).unwrap_or(true) {
        if let Some(p) = profile_from_value(payload) {
            return Some(p);
        }
    }

    for block in extract_fenced_blocks(raw_text) {
        if let Some(v) = parse_json_or_yaml_subset(&block) {
            if let Some(p) = profile_from_value(&v) {
                return Some(p);
            }
        }
    }

    if let Some(v) = parse_json_or_yaml_subset(raw_text) {
        if let Some(p) = profile_from_value(&v) {
            return Some(p);
        }
    }
    None
}

/// Extracts the contents of ` ```(json|yaml)? ... ``` ` fenced blocks, in document order.
pub fn extract_fenced_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("```") {
            let mut body = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                body.push(inner);
            }
            blocks.push(body.join("\n"));
        }
    }
    blocks
}
