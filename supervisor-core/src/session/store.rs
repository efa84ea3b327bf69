//! Process-local session store, persisted to `chat_sessions.json` (spec §4.2).
//!
//! Invariants upheld here: `used_actions`/`blocked_actions` only move forward within
//! [`ChatSession::push_pending_message`]'s caller-supplied patch (callers are responsible for
//! not decreasing them — the store does not re-derive budget semantics); pending messages are
//! capped at [`super::types::MAX_PENDING_MESSAGES`]; writes for one chat are serialized by a
//! per-chat lock, and the whole-file write itself is additionally serialized by the data lock
//! so concurrent writers for different chats never interleave a torn file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::error::SessionError;
use super::types::{ChatId, ChatSession};

pub struct SessionStore {
    path: PathBuf,
    data: RwLock<HashMap<ChatId, ChatSession>>,
    chat_locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl SessionStore {
    /// Loads existing session state from `path` if present; otherwise starts empty. The file is
    /// not required to exist on first run.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(SessionError::Read(e)),
        };
        Ok(SessionStore {
            path,
            data: RwLock::new(data),
            chat_locks: Mutex::new(HashMap::new()),
        })
    }

    async fn chat_lock(&self, chat_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.chat_locks.lock().await;
        locks
            .entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns a normalized session; a chat with no recorded state gets the default (idle,
    /// empty) session without being persisted.
    pub async fn get(&self, chat_id: &str) -> ChatSession {
        let data = self.data.read().await;
        data.get(chat_id)
            .cloned()
            .unwrap_or_else(|| ChatSession::new(chat_id.to_string()))
    }

    /// Applies a shallow patch under the chat's critical section, persists the whole file, and
    /// returns the updated session.
    pub async fn upsert<F>(&self, chat_id: &str, patch: F) -> Result<ChatSession, SessionError>
    where
        F: FnOnce(&mut ChatSession),
    {
        let lock = self.chat_lock(chat_id).await;
        let _guard = lock.lock().await;

        let snapshot = {
            let mut data = self.data.write().await;
            let session = data
                .entry(chat_id.to_string())
                .or_insert_with(|| ChatSession::new(chat_id.to_string()));
            patch(session);
            session.updated_at = chrono::Utc::now();
            session.clone()
        };
        self.persist().await?;
        Ok(snapshot)
    }

    pub async fn clear(&self, chat_id: &str) -> Result<(), SessionError> {
        let lock = self.chat_lock(chat_id).await;
        let _guard = lock.lock().await;
        {
            let mut data = self.data.write().await;
            data.remove(chat_id);
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), SessionError> {
        let data = self.data.read().await;
        let json = serde_json::to_string_pretty(&*data)?;
        write_atomic(&self.path, &json).await.map_err(SessionError::Write)
    }
}

/// Write-temp-then-rename so readers never observe a partially written file.
async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::RunState;

    #[tokio::test]
    async fn get_on_missing_chat_returns_default_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_sessions.json");
        let store = SessionStore::load(&path).await.unwrap();
        let session = store.get("chat1").await;
        assert_eq!(session.state, RunState::Idle);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn upsert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_sessions.json");
        let store = SessionStore::load(&path).await.unwrap();
        store
            .upsert("chat1", |s| {
                s.state = RunState::Routing;
                s.budget.used_actions = 2;
            })
            .await
            .unwrap();

        let reloaded = SessionStore::load(&path).await.unwrap();
        let session = reloaded.get("chat1").await;
        assert_eq!(session.state, RunState::Routing);
        assert_eq!(session.budget.used_actions, 2);
    }

    #[tokio::test]
    async fn clear_removes_chat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_sessions.json");
        let store = SessionStore::load(&path).await.unwrap();
        store.upsert("chat1", |s| s.budget.used_actions = 1).await.unwrap();
        store.clear("chat1").await.unwrap();
        let session = store.get("chat1").await;
        assert_eq!(session.budget.used_actions, 0);
    }

    #[tokio::test]
    async fn pending_messages_capped_at_fifty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_sessions.json");
        let store = SessionStore::load(&path).await.unwrap();
        store
            .upsert("chat1", |s| {
                for i in 0..60 {
                    s.push_pending_message(super::super::types::PendingMessage {
                        ts: chrono::Utc::now(),
                        user_id: "u1".into(),
                        text: format!("msg{i}"),
                        external_message_id: None,
                    });
                }
            })
            .await
            .unwrap();
        let session = store.get("chat1").await;
        assert_eq!(session.pending_user_messages.len(), 50);
        assert_eq!(session.pending_user_messages[0].text, "msg10");
        assert_eq!(session.pending_user_messages[49].text, "msg59");
    }
}
