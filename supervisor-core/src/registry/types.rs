//! Registry record types (spec §4.5 `AgentProfile`/`Tool`/`JobConfig`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where an agent profile came from; attached to profiles installed from the public library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOrigin {
    pub kind: String,
    #[serde(default)]
    pub blueprint_id: Option<String>,
    pub installed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub origin: Option<AgentOrigin>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub declared_action_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub enabled_agent_ids: Vec<String>,
    #[serde(default)]
    pub enabled_tool_names: Vec<String>,
    #[serde(default)]
    pub allow_actions: Option<Vec<String>>,
    #[serde(default)]
    pub max_actions: Option<u32>,
}

/// Result of a registry load: the ordered list plus an id index (spec's `{agents[], byId}`).
#[derive(Debug, Clone, Default)]
pub struct AgentCatalog {
    pub agents: Vec<AgentProfile>,
    pub by_id: HashMap<String, AgentProfile>,
}

impl AgentCatalog {
    pub fn from_agents(agents: Vec<AgentProfile>) -> Self {
        let by_id = agents.iter().map(|a| (a.id.clone(), a.clone())).collect();
        AgentCatalog { agents, by_id }
    }
}
