//! Creates and updates agent profiles, and installs blueprints from the public library
//! (spec §4.5 `upsertAgentProfile`, "install from public library").

use std::sync::Arc;

use goc_client::{KnowledgeStoreClient, NewResource, NEXT_PART};
use serde_json::{json, Value};

use super::decode::decode_profile_from_resource;
use super::error::RegistryError;
use super::types::{AgentOrigin, AgentProfile};

const AGENT_PROFILE_KIND: &str = "agent_profile";

pub struct AgentWriter {
    client: Arc<KnowledgeStoreClient>,
}

impl AgentWriter {
    pub fn new(client: Arc<KnowledgeStoreClient>) -> Self {
        AgentWriter { client }
    }

    /// Creates a new `agent_profile` resource chained from `previous_node_id` (the last node
    /// for this agent id, if any) via a `NEXT_PART` edge. The id is lowercase-slug-enforced.
    pub async fn upsert_agent_profile(
        &self,
        context_set_id: &str,
        mut profile: AgentProfile,
        previous_node_id: Option<&str>,
        op: &str,
    ) -> Result<AgentProfile, RegistryError> {
        profile.id = crate::action::normalize_slug(&profile.id);
        if profile.id.is_empty() {
            return Err(RegistryError::InvalidAgentId(profile.id));
        }

        let raw_text = serde_json::to_string_pretty(&profile).unwrap_or_default();
        let created = self
            .client
            .create_resource(&NewResource {
                context_set_id: context_set_id.to_string(),
                name: AGENT_PROFILE_KIND.to_string(),
                summary: profile.name.clone(),
                text_mode: "plain".to_string(),
                raw_text,
                resource_kind: AGENT_PROFILE_KIND.to_string(),
                uri: None,
                auto_activate: true,
                attach_to: previous_node_id.map(str::to_string),
                payload_json: json!({ "agent_profile": profile, "op": op }),
            })
            .await?;

        if let Some(prev) = previous_node_id {
            self.client.create_edge(prev, &created.id, NEXT_PART).await?;
        }
        Ok(profile)
    }

    /// Resolves a blueprint resource from the public library, repairs/fills its agent profile
    /// (defaults + optional id override), then upserts it into the agents service thread.
    pub async fn install_from_public_library(
        &self,
        agents_context_set_id: &str,
        blueprint_node_id: &str,
        agent_id_override: Option<&str>,
        previous_node_id: Option<&str>,
    ) -> Result<AgentProfile, RegistryError> {
        let blueprint = self
            .client
            .get_node(blueprint_node_id)
            .await
            .map_err(|_| RegistryError::BlueprintNotFound(blueprint_node_id.to_string()))?;

        let mut profile =
            decode_profile_from_resource(&blueprint.payload_json, &blueprint.raw_text)
                .ok_or_else(|| RegistryError::UndecodableProfile {
                    resource_id: blueprint_node_id.to_string(),
                })?;

        if let Some(override_id) = agent_id_override {
            profile.id = crate::action::normalize_slug(override_id);
        }
        fill_profile_defaults(&mut profile);
        profile.origin = Some(AgentOrigin {
            kind: "public_library".to_string(),
            blueprint_id: Some(blueprint_node_id.to_string()),
            installed_at: chrono::Utc::now(),
        });

        self.upsert_agent_profile(agents_context_set_id, profile, previous_node_id, "install")
            .await
    }
}

fn fill_profile_defaults(profile: &mut AgentProfile) {
    if profile.name.is_empty() {
        profile.name = profile.id.clone();
    }
    if profile.provider.is_empty() {
        profile.provider = "other".to_string();
    }
    if !profile.metadata.contains_key("installed") {
        profile.metadata.insert("installed".to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_profile(id: &str) -> AgentProfile {
        AgentProfile {
            id: id.to_string(),
            name: "Sample".to_string(),
            description: String::new(),
            provider: "researcher".to_string(),
            model: String::new(),
            system_prompt: "do research".to_string(),
            tools: Vec::new(),
            enabled: true,
            origin: None,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn upsert_agent_profile_creates_resource_and_chains_edge() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "res-2", "name": "agent_profile", "context_set_id": "cs-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/edges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = Arc::new(KnowledgeStoreClient::new(server.uri(), "key"));
        let writer = AgentWriter::new(client);
        let profile = writer
            .upsert_agent_profile("cs-1", sample_profile("Researcher-1"), Some("res-1"), "update")
            .await
            .unwrap();
        assert_eq!(profile.id, "researcher-1");
    }

    #[tokio::test]
    async fn upsert_agent_profile_rejects_empty_id() {
        let client = Arc::new(KnowledgeStoreClient::new("http://unused", "key"));
        let writer = AgentWriter::new(client);
        let err = writer
            .upsert_agent_profile("cs-1", sample_profile("   "), None, "create")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAgentId(_)));
    }

    #[tokio::test]
    async fn install_from_public_library_applies_override_and_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nodes/bp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "bp-1",
                "name": "blueprint",
                "context_set_id": "lib-cs",
                "raw_text": "id: template\nname: Template\nprovider: researcher\n",
                "payload_json": {}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "res-3", "name": "agent_profile", "context_set_id": "cs-1"
            })))
            .mount(&server)
            .await;

        let client = Arc::new(KnowledgeStoreClient::new(server.uri(), "key"));
        let writer = AgentWriter::new(client);
        let profile = writer
            .install_from_public_library("cs-1", "bp-1", Some("custom-name"), None)
            .await
            .unwrap();
        assert_eq!(profile.id, "custom-name");
        assert_eq!(profile.origin.unwrap().kind, "public_library");
    }
}
