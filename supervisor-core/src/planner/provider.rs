//! The chat-model seam the planner calls through (spec §4.6). Object-safe so a live HTTP-backed
//! implementation and a fixed-response test double can share call sites.

use async_trait::async_trait;

/// One completion call: a composed prompt in, raw assistant text out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ChatProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChatProviderError {
    #[error("chat provider call cancelled")]
    Cancelled,
    #[error("chat provider call failed: {0}")]
    Failed(String),
}

/// Fixed-response double for tests: returns the same text (or error) every call.
pub struct MockChatProvider {
    pub response: Result<String, String>,
}

impl MockChatProvider {
    pub fn ok(text: impl Into<String>) -> Self {
        MockChatProvider { response: Ok(text.into()) }
    }

    pub fn err(message: impl Into<String>) -> Self {
        MockChatProvider { response: Err(message.into()) }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, ChatProviderError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(ChatProviderError::Failed(message.clone())),
        }
    }
}
