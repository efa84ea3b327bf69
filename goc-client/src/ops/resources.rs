//! Resource (node) and edge operations.

use serde_json::{json, Value};

use crate::client::{extract_list, Attempt, KnowledgeStoreClient};
use crate::error::KnowledgeStoreError;
use crate::model::{Edge, NewResource, Resource};

impl KnowledgeStoreClient {
    pub async fn create_resource(
        &self,
        resource: &NewResource,
    ) -> Result<Resource, KnowledgeStoreError> {
        let body = serde_json::to_value(resource).map_err(|e| KnowledgeStoreError::Decode {
            operation: "create_resource".into(),
            message: e.to_string(),
        })?;
        let attempts = vec![
            Attempt::post("/resources", body.clone()),
            Attempt::post("/api/resources", body),
        ];
        let body = self.try_attempts_json("create_resource", attempts).await?;
        decode_resource(&body, "create_resource")
    }

    /// Lists resources in a context set. Falls back to a graph read + kind filter when the
    /// indexed list endpoint is unavailable (spec §4.3).
    pub async fn list_resources(
        &self,
        context_set_id: &str,
    ) -> Result<Vec<Resource>, KnowledgeStoreError> {
        let indexed = Attempt::get("/resources").query("context_set_id", context_set_id);
        match self
            .try_attempts_json("list_resources", vec![indexed])
            .await
        {
            Ok(body) => extract_list(&body, "resources")
                .into_iter()
                .map(|v| decode_resource(&v, "list_resources"))
                .collect(),
            Err(KnowledgeStoreError::AllAttemptsFailed { .. }) => {
                let graph = Attempt::get(format!("/context-sets/{context_set_id}/graph"));
                let body = self
                    .try_attempts_json("list_resources_graph_fallback", vec![graph])
                    .await?;
                let nodes = extract_list(&body, "nodes");
                nodes
                    .into_iter()
                    .filter(|n| {
                        n.get("resource_kind")
                            .and_then(Value::as_str)
                            .map(|k| !k.is_empty())
                            .unwrap_or(false)
                    })
                    .map(|v| decode_resource(&v, "list_resources_graph_fallback"))
                    .collect()
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_node(&self, node_id: &str) -> Result<Resource, KnowledgeStoreError> {
        let attempts = vec![Attempt::get(format!("/nodes/{node_id}"))];
        let body = self.try_attempts_json("get_node", attempts).await?;
        decode_resource(&body, "get_node")
    }

    pub async fn create_edge(
        &self,
        from_id: &str,
        to_id: &str,
        edge_type: &str,
    ) -> Result<Edge, KnowledgeStoreError> {
        let attempts = vec![Attempt::post(
            "/edges",
            json!({ "from_id": from_id, "to_id": to_id, "type": edge_type }),
        )];
        self.try_attempts_json("create_edge", attempts).await?;
        Ok(Edge {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            edge_type: edge_type.to_string(),
        })
    }

    pub async fn activate_nodes(&self, node_ids: &[String]) -> Result<(), KnowledgeStoreError> {
        let attempts = vec![Attempt::post(
            "/nodes/activate",
            json!({ "node_ids": node_ids }),
        )];
        self.try_attempts_json("activate_nodes", attempts).await?;
        Ok(())
    }

    pub async fn deactivate_nodes(&self, node_ids: &[String]) -> Result<(), KnowledgeStoreError> {
        let attempts = vec![Attempt::post(
            "/nodes/deactivate",
            json!({ "node_ids": node_ids }),
        )];
        self.try_attempts_json("deactivate_nodes", attempts)
            .await?;
        Ok(())
    }
}

fn decode_resource(value: &Value, operation: &str) -> Result<Resource, KnowledgeStoreError> {
    serde_json::from_value(value.clone()).map_err(|e| KnowledgeStoreError::Decode {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}
