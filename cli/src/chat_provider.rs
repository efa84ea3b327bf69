//! [`ChatProvider`] backed by an OpenAI-compatible chat completions endpoint (spec §4.6, the
//! planner's LLM seam). Identical to `telegram-bot`'s; duplicated rather than shared since the
//! two crates have no common lib target.

use async_trait::async_trait;
use serde_json::json;
use supervisor_core::planner::{ChatProvider, ChatProviderError};

pub struct HttpChatProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpChatProvider {
    /// Reads `PLANNER_API_URL` (default `https://api.openai.com/v1`), `PLANNER_API_KEY`, and
    /// `PLANNER_MODEL` (default `gpt-4o-mini`) from the environment.
    pub fn from_env() -> Self {
        HttpChatProvider {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("reqwest client builds with default TLS backend"),
            base_url: std::env::var("PLANNER_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("PLANNER_API_KEY").unwrap_or_default(),
            model: std::env::var("PLANNER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        }
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ChatProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.2,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatProviderError::Failed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatProviderError::Failed(format!("{status}: {text}")));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatProviderError::Failed(e.to_string()))?;

        parsed
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ChatProviderError::Failed("no message content in response".to_string()))
    }
}
