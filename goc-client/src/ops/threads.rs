//! Thread and context-set operations.

use serde_json::{json, Value};

use crate::client::{extract_list, Attempt, KnowledgeStoreClient};
use crate::error::KnowledgeStoreError;
use crate::model::{ContextSet, Thread};

impl KnowledgeStoreClient {
    pub async fn create_thread(&self, title: &str) -> Result<Thread, KnowledgeStoreError> {
        let attempts = vec![
            Attempt::post("/threads", json!({ "title": title })),
            Attempt::post("/api/threads", json!({ "name": title })),
        ];
        let body = self.try_attempts_json("create_thread", attempts).await?;
        decode_thread(&body, "create_thread")
    }

    pub async fn list_threads(&self) -> Result<Vec<Thread>, KnowledgeStoreError> {
        let attempts = vec![Attempt::get("/threads"), Attempt::get("/api/threads")];
        let body = self.try_attempts_json("list_threads", attempts).await?;
        extract_list(&body, "threads")
            .into_iter()
            .map(|v| decode_thread(&v, "list_threads"))
            .collect()
    }

    /// Finds a thread by exact title match (used for `job:<id>` and service thread titles).
    pub async fn find_thread_by_title(
        &self,
        title: &str,
    ) -> Result<Option<Thread>, KnowledgeStoreError> {
        Ok(self
            .list_threads()
            .await?
            .into_iter()
            .find(|t| t.title == title))
    }

    pub async fn list_context_sets(
        &self,
        thread_id: &str,
    ) -> Result<Vec<ContextSet>, KnowledgeStoreError> {
        let attempts = vec![
            Attempt::get(format!("/threads/{thread_id}/context-sets")),
            Attempt::get("/context-sets").query("thread_id", thread_id),
        ];
        let body = self.try_attempts_json("list_context_sets", attempts).await?;
        extract_list(&body, "context_sets")
            .into_iter()
            .map(|v| decode_context_set(&v, "list_context_sets"))
            .collect()
    }

    pub async fn create_context_set(
        &self,
        thread_id: &str,
        name: &str,
    ) -> Result<ContextSet, KnowledgeStoreError> {
        let attempts = vec![
            Attempt::post(
                format!("/threads/{thread_id}/context-sets"),
                json!({ "name": name }),
            ),
            Attempt::post(
                "/context-sets",
                json!({ "thread_id": thread_id, "name": name }),
            ),
        ];
        let body = self
            .try_attempts_json("create_context_set", attempts)
            .await?;
        decode_context_set(&body, "create_context_set")
    }
}

fn decode_thread(value: &Value, operation: &str) -> Result<Thread, KnowledgeStoreError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| decode_err(operation, "missing id"))?
        .to_string();
    let title = value
        .get("title")
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(Thread { id, title })
}

fn decode_context_set(value: &Value, operation: &str) -> Result<ContextSet, KnowledgeStoreError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| decode_err(operation, "missing id"))?
        .to_string();
    let thread_id = value
        .get("thread_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(ContextSet {
        id,
        thread_id,
        name,
    })
}

fn decode_err(operation: &str, message: &str) -> KnowledgeStoreError {
    KnowledgeStoreError::Decode {
        operation: operation.to_string(),
        message: message.to_string(),
    }
}
