//! Compiled-context reads and UI token minting.

use serde_json::Value;

use crate::client::{Attempt, KnowledgeStoreClient};
use crate::error::KnowledgeStoreError;
use crate::model::{CompiledContext, CompiledContextExplain, UiToken};

impl KnowledgeStoreClient {
    /// Reads the current compiled text for a context set. Returns only the text body; if the
    /// body is an HTML document the underlying client call raises
    /// [`KnowledgeStoreError::HtmlBodyReturned`] rather than returning it as text.
    pub async fn get_compiled_context(
        &self,
        context_set_id: &str,
    ) -> Result<CompiledContext, KnowledgeStoreError> {
        let attempts = vec![
            Attempt::get(format!("/context-sets/{context_set_id}/compiled")),
            Attempt::get("/compiled-context").query("context_set_id", context_set_id),
        ];
        let text = self
            .try_attempts_text("get_compiled_context", attempts)
            .await?;
        Ok(CompiledContext {
            compiled_text: text,
        })
    }

    /// Same as [`Self::get_compiled_context`] but requests the explain payload and active node
    /// ids alongside the compiled text. The JSON response wraps `compiled_text` so this path
    /// uses the JSON attempt machinery, not the raw-text one.
    pub async fn get_compiled_context_explain(
        &self,
        context_set_id: &str,
    ) -> Result<CompiledContextExplain, KnowledgeStoreError> {
        let attempts = vec![
            Attempt::get(format!("/context-sets/{context_set_id}/compiled"))
                .query("explain", "true"),
            Attempt::get("/compiled-context")
                .query("context_set_id", context_set_id)
                .query("explain", "true"),
        ];
        let body = self
            .try_attempts_json("get_compiled_context_explain", attempts)
            .await?;
        let compiled_text = body
            .get("compiled_text")
            .and_then(Value::as_str)
            .ok_or_else(|| KnowledgeStoreError::Decode {
                operation: "get_compiled_context_explain".into(),
                message: "missing compiled_text".into(),
            })?;
        if looks_like_html(compiled_text) {
            return Err(KnowledgeStoreError::HtmlBodyReturned {
                operation: "get_compiled_context_explain".into(),
            });
        }
        let active_node_ids = body
            .get("active_node_ids")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(CompiledContextExplain {
            compiled_text: compiled_text.to_string(),
            explain: body.get("explain").cloned().unwrap_or(Value::Null),
            active_node_ids,
        })
    }

    /// Mints a short-lived UI token. Missing token in the response is fatal, per spec §4.3.
    pub async fn mint_ui_token(
        &self,
        thread_id: &str,
        context_set_id: &str,
    ) -> Result<UiToken, KnowledgeStoreError> {
        let attempts = vec![Attempt::post(
            "/ui-tokens",
            serde_json::json!({ "thread_id": thread_id, "context_set_id": context_set_id }),
        )];
        let body = self.try_attempts_json("mint_ui_token", attempts).await?;
        serde_json::from_value(body).map_err(|_| KnowledgeStoreError::Fatal {
            operation: "mint_ui_token".into(),
            message: "missing token in response".into(),
        })
    }
}

/// Builds the `<base>?thread=<tid>&ctx=<cid>#token=<tok>` UI link from a minted token.
pub fn build_ui_link(ui_base: &str, thread_id: &str, context_set_id: &str, token: &UiToken) -> String {
    format!(
        "{}?thread={}&ctx={}#token={}",
        ui_base.trim_end_matches('/'),
        thread_id,
        context_set_id,
        token.token
    )
}

fn looks_like_html(body: &str) -> bool {
    let trimmed = body.trim_start().to_ascii_lowercase();
    trimmed.starts_with("<!doctype html") || trimmed.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_ui_link_formats_expected_shape() {
        let token = UiToken {
            token: "abc123".into(),
            exp: 1000,
        };
        let link = build_ui_link("https://ui.example", "t1", "c1", &token);
        assert_eq!(link, "https://ui.example?thread=t1&ctx=c1#token=abc123");
    }
}
