//! Loads the agent catalog from the knowledge store (spec §4.5 `loadAgentsFromGoc`).

use std::path::Path;
use std::sync::Arc;

use goc_client::KnowledgeStoreClient;

use crate::goc::GocCoordinator;

use super::decode::decode_profile_from_resource;
use super::error::RegistryError;
use super::types::{AgentCatalog, AgentOrigin, AgentProfile};

const AGENTS_THREAD_TITLES: &[&str] = &["agents", "service:agents"];
const AGENT_PROFILE_KIND: &str = "agent_profile";

pub struct AgentRegistry {
    client: Arc<KnowledgeStoreClient>,
    coordinator: Arc<GocCoordinator>,
}

impl AgentRegistry {
    pub fn new(client: Arc<KnowledgeStoreClient>, coordinator: Arc<GocCoordinator>) -> Self {
        AgentRegistry { client, coordinator }
    }

    /// Loads the catalog: service-thread resources, compiled context (if requested), and a
    /// local static fallback if nothing else yields a single profile.
    pub async fn load_agents_from_goc(
        &self,
        base_dir: &Path,
        include_compiled: bool,
    ) -> Result<AgentCatalog, RegistryError> {
        let map_path = base_dir.join("goc.service.json");
        let mapping = self
            .coordinator
            .ensure_service_thread(&map_path, AGENTS_THREAD_TITLES)
            .await?;
        let context_set_id = mapping
            .shared_context_set_id
            .clone()
            .expect("ensure_service_thread always sets this");

        let mut resources = self.client.list_resources(&context_set_id).await?;
        resources.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id: std::collections::HashMap<String, AgentProfile> =
            std::collections::HashMap::new();
        for resource in &resources {
            if resource.resource_kind != AGENT_PROFILE_KIND {
                continue;
            }
            if let Some(profile) = decode_profile_from_resource(&resource.payload_json, &resource.raw_text) {
                by_id.insert(profile.id.clone(), profile);
            }
        }

        if include_compiled {
            if let Ok(compiled) = self.client.get_compiled_context(&context_set_id).await {
                for block in super::decode::extract_fenced_blocks(&compiled.compiled_text) {
                    if let Some(v) = super::yaml_subset::parse_json_or_yaml_subset(&block) {
                        if let Some(profile) = super::decode::profile_from_value(&v) {
                            if !profile.system_prompt.is_empty() {
                                by_id.insert(profile.id.clone(), profile);
                            }
                        }
                    }
                }
            }
        }

        if by_id.is_empty() {
            let fallback = static_fallback_bundle();
            for profile in fallback {
                by_id.insert(profile.id.clone(), profile);
            }
        }

        let mut agents: Vec<AgentProfile> = by_id.values().cloned().collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(AgentCatalog::from_agents(agents))
    }
}

/// Minimal built-in agents used when the knowledge store has no `agent_profile` resources at
/// all (fresh workspace, store unreachable on first run).
fn static_fallback_bundle() -> Vec<AgentProfile> {
    vec![
        AgentProfile {
            id: "researcher".to_string(),
            name: "Researcher".to_string(),
            description: "Gathers and summarizes information.".to_string(),
            provider: "researcher".to_string(),
            model: String::new(),
            system_prompt: "You research topics thoroughly and report findings plainly.".to_string(),
            tools: Vec::new(),
            enabled: true,
            origin: Some(AgentOrigin {
                kind: "builtin".to_string(),
                blueprint_id: None,
                installed_at: chrono::Utc::now(),
            }),
            metadata: Default::default(),
        },
        AgentProfile {
            id: "coder".to_string(),
            name: "Coder".to_string(),
            description: "Writes and edits code.".to_string(),
            provider: "coder".to_string(),
            model: String::new(),
            system_prompt: "You write correct, minimal code changes.".to_string(),
            tools: Vec::new(),
            enabled: true,
            origin: Some(AgentOrigin {
                kind: "builtin".to_string(),
                blueprint_id: None,
                installed_at: chrono::Utc::now(),
            }),
            metadata: Default::default(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_store_with_profiles() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "thread-1", "title": "agents"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread-1/context-sets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "cs-1", "thread_id": "thread-1", "name": "shared"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "res-1",
                    "name": "agent_profile",
                    "context_set_id": "cs-1",
                    "resource_kind": "agent_profile",
                    "raw_text": "id: planner-x\nname: Planner X\nprovider: planner\n",
                    "payload_json": {}
                }
            ])))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn load_agents_from_goc_decodes_resource_and_skips_static_fallback() {
        let server = mock_store_with_profiles().await;
        let client = Arc::new(KnowledgeStoreClient::new(server.uri(), "key"));
        let coordinator = Arc::new(GocCoordinator::new(client.clone()));
        let registry = AgentRegistry::new(client, coordinator);
        let dir = tempfile::tempdir().unwrap();

        let catalog = registry.load_agents_from_goc(dir.path(), false).await.unwrap();
        assert_eq!(catalog.agents.len(), 1);
        assert_eq!(catalog.by_id.get("planner-x").unwrap().provider, "planner");
    }

    #[tokio::test]
    async fn load_agents_from_goc_falls_back_to_static_bundle_when_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "thread-1", "title": "agents"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/threads/thread-1/context-sets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "cs-1", "thread_id": "thread-1", "name": "shared"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let client = Arc::new(KnowledgeStoreClient::new(server.uri(), "key"));
        let coordinator = Arc::new(GocCoordinator::new(client.clone()));
        let registry = AgentRegistry::new(client, coordinator);
        let dir = tempfile::tempdir().unwrap();

        let catalog = registry.load_agents_from_goc(dir.path(), false).await.unwrap();
        assert!(catalog.by_id.contains_key("researcher"));
        assert!(catalog.by_id.contains_key("coder"));
    }
}
