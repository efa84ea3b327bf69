//! Action and ActionPlan types.
//!
//! Actions are a tagged-variant sum type, not a class hierarchy (see spec.md Design Note
//! "tagged variants vs. class hierarchy"): one `enum` with one variant per operation, each
//! carrying only the fields that operation needs, plus a uniform `risk` accessor.

use serde::{Deserialize, Serialize};

/// Risk level: L0 (read) < L1 (benign write) < L2 (sensitive) < L3 (file-write / destructive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Risk {
    L0,
    L1,
    L2,
    L3,
}

impl Risk {
    pub fn as_u8(self) -> u8 {
        match self {
            Risk::L0 => 0,
            Risk::L1 => 1,
            Risk::L2 => 2,
            Risk::L3 => 3,
        }
    }
}

/// The executor kind behind an agent profile. A small closed enum aliased from a lookup table
/// of provider key synonyms (see [`crate::registry::provider_from_key`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Planner,
    Coder,
    Researcher,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalResponseStyle {
    Concise,
    Detailed,
}

impl Default for FinalResponseStyle {
    fn default() -> Self {
        FinalResponseStyle::Concise
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptMode {
    Cancel,
    Replan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    Current,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusDetail {
    Summary,
    Full,
}

/// Draft profile fields carried by `propose_agent` / `create_agent`; a subset of
/// [`crate::registry::AgentProfile`] before it is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftProfile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// One typed, validated operation in a plan.
///
/// Every variant carries its effective `risk`; use [`Action::risk`] rather than matching on the
/// variant when only the risk is needed (e.g. in the approval gate).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    RunAgent {
        agent_id: String,
        goal: String,
        #[serde(default)]
        inputs: serde_json::Map<String, serde_json::Value>,
        risk: Risk,
    },
    ProposeAgent {
        draft: DraftProfile,
        risk: Risk,
    },
    NeedMoreDetail {
        context_set_id: String,
        #[serde(default)]
        node_ids: Vec<String>,
        depth: u32,
        max_chars: u32,
        risk: Risk,
    },
    OpenContext {
        scope: ContextScope,
        risk: Risk,
    },
    Summarize {
        hint: String,
        risk: Risk,
    },
    SearchPublicAgents {
        query: String,
        limit: u32,
        risk: Risk,
    },
    InstallAgentBlueprint {
        blueprint_id: String,
        public_node_id: String,
        agent_id_override: Option<String>,
        risk: Risk,
    },
    PublishAgent {
        agent_node_id: String,
        agent_id: String,
        risk: Risk,
    },
    EnableAgent {
        agent_id: String,
    },
    DisableAgent {
        agent_id: String,
    },
    EnableTool {
        tool_id: String,
    },
    DisableTool {
        tool_id: String,
    },
    ListAgents {
        #[serde(default)]
        include_disabled: bool,
    },
    ListTools {
        #[serde(default)]
        include_disabled: bool,
    },
    CreateAgent {
        profile: DraftProfile,
        format: String,
    },
    UpdateAgent {
        agent_id: String,
        patch: serde_json::Map<String, serde_json::Value>,
        format: String,
    },
    GetStatus {
        detail: StatusDetail,
    },
    Interrupt {
        mode: InterruptMode,
        note: String,
    },
    SpawnAgents {
        summary: String,
        agents: Vec<String>,
        max_parallel: u32,
    },
}

impl Action {
    /// Effective risk for this action. Side-effect toggles and read-only listings are always
    /// L0; everything else carries an explicit risk field.
    pub fn risk(&self) -> Risk {
        match self {
            Action::RunAgent { risk, .. }
            | Action::ProposeAgent { risk, .. }
            | Action::NeedMoreDetail { risk, .. }
            | Action::OpenContext { risk, .. }
            | Action::Summarize { risk, .. }
            | Action::SearchPublicAgents { risk, .. }
            | Action::InstallAgentBlueprint { risk, .. }
            | Action::PublishAgent { risk, .. } => *risk,
            Action::EnableAgent { .. }
            | Action::DisableAgent { .. }
            | Action::EnableTool { .. }
            | Action::DisableTool { .. }
            | Action::ListAgents { .. }
            | Action::ListTools { .. }
            | Action::GetStatus { .. }
            | Action::Interrupt { .. } => Risk::L0,
            Action::CreateAgent { .. } => Risk::L2,
            Action::UpdateAgent { .. } => Risk::L2,
            Action::SpawnAgents { .. } => Risk::L1,
        }
    }

    /// The action-type tag used by the allowlist and by tool-contributed `action_types`.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::RunAgent { .. } => "run_agent",
            Action::ProposeAgent { .. } => "propose_agent",
            Action::NeedMoreDetail { .. } => "need_more_detail",
            Action::OpenContext { .. } => "open_context",
            Action::Summarize { .. } => "summarize",
            Action::SearchPublicAgents { .. } => "search_public_agents",
            Action::InstallAgentBlueprint { .. } => "install_agent_blueprint",
            Action::PublishAgent { .. } => "publish_agent",
            Action::EnableAgent { .. } => "enable_agent",
            Action::DisableAgent { .. } => "disable_agent",
            Action::EnableTool { .. } => "enable_tool",
            Action::DisableTool { .. } => "disable_tool",
            Action::ListAgents { .. } => "list_agents",
            Action::ListTools { .. } => "list_tools",
            Action::CreateAgent { .. } => "create_agent",
            Action::UpdateAgent { .. } => "update_agent",
            Action::GetStatus { .. } => "get_status",
            Action::Interrupt { .. } => "interrupt",
            Action::SpawnAgents { .. } => "spawn_agents",
        }
    }

    /// `true` for `enable_*`/`disable_*` toggles, which short-circuit the remainder of a plan
    /// (spec §4.7 step 7 — a selection change takes effect next turn).
    pub fn is_selection_update(&self) -> bool {
        matches!(
            self,
            Action::EnableAgent { .. }
                | Action::DisableAgent { .. }
                | Action::EnableTool { .. }
                | Action::DisableTool { .. }
        )
    }
}

/// Reason + ordered bounded list of [`Action`]s + final-response style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub reason: String,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub final_response_style: FinalResponseStyle,
}
