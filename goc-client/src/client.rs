//! Core attempt machinery: one logical operation tries an ordered list of HTTP shapes
//! (path/query/body variants) until one succeeds or returns a non-retryable status.

use reqwest::Method;
use serde_json::Value;

use crate::error::{KnowledgeStoreError, RETRYABLE_STATUSES};

/// One HTTP shape to try for a logical operation.
#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Attempt {
    pub fn get(path: impl Into<String>) -> Self {
        Attempt {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Attempt {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

/// Thin, retry-capable client for the external knowledge-graph store.
///
/// Each logical operation in `ops/*` builds an ordered [`Attempt`] list and calls
/// [`KnowledgeStoreClient::try_attempts_json`] or [`KnowledgeStoreClient::try_attempts_text`];
/// the client tries them in order, stopping at the first success or the first
/// non-retryable status. See [`crate::error::RETRYABLE_STATUSES`].
#[derive(Clone)]
pub struct KnowledgeStoreClient {
    http: reqwest::Client,
    base: String,
    service_key: String,
}

impl KnowledgeStoreClient {
    pub fn new(base: impl Into<String>, service_key: impl Into<String>) -> Self {
        KnowledgeStoreClient {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with default TLS backend"),
            base: base.into(),
            service_key: service_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    fn authed(&self, attempt: &Attempt) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(attempt.method.clone(), self.url(&attempt.path))
            .header("Authorization", format!("ServiceKey {}", self.service_key));
        if !attempt.query.is_empty() {
            req = req.query(&attempt.query);
        }
        if let Some(body) = &attempt.body {
            req = req.json(body);
        }
        req
    }

    /// Runs attempts expecting a JSON response body.
    pub(crate) async fn try_attempts_json(
        &self,
        operation: &str,
        attempts: Vec<Attempt>,
    ) -> Result<Value, KnowledgeStoreError> {
        let mut last_status: Option<u16> = None;
        for attempt in attempts {
            let resp = match self.authed(&attempt).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(operation, error = %e, "attempt transport error, trying next");
                    continue;
                }
            };
            let status = resp.status();
            if status.is_success() {
                let text = resp.text().await?;
                return serde_json::from_str(&text).map_err(|e| KnowledgeStoreError::Decode {
                    operation: operation.to_string(),
                    message: e.to_string(),
                });
            }
            let code = status.as_u16();
            last_status = Some(code);
            if RETRYABLE_STATUSES.contains(&code) {
                tracing::debug!(operation, status = code, "retryable status, trying next attempt");
                continue;
            }
            let text = resp.text().await.unwrap_or_default();
            return Err(KnowledgeStoreError::Fatal {
                operation: operation.to_string(),
                message: format!("HTTP {code}: {text}"),
            });
        }
        Err(KnowledgeStoreError::AllAttemptsFailed {
            operation: operation.to_string(),
            last_status,
        })
    }

    /// Runs attempts expecting a raw text response body (compiled context read).
    ///
    /// Raises [`KnowledgeStoreError::HtmlBodyReturned`] rather than returning an HTML document
    /// as compiled text — this is the one response shape the client refuses to pass through.
    pub(crate) async fn try_attempts_text(
        &self,
        operation: &str,
        attempts: Vec<Attempt>,
    ) -> Result<String, KnowledgeStoreError> {
        let mut last_status: Option<u16> = None;
        for attempt in attempts {
            let resp = match self.authed(&attempt).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(operation, error = %e, "attempt transport error, trying next");
                    continue;
                }
            };
            let status = resp.status();
            if status.is_success() {
                let text = resp.text().await?;
                if looks_like_html(&text) {
                    return Err(KnowledgeStoreError::HtmlBodyReturned {
                        operation: operation.to_string(),
                    });
                }
                return Ok(text);
            }
            let code = status.as_u16();
            last_status = Some(code);
            if RETRYABLE_STATUSES.contains(&code) {
                continue;
            }
            let text = resp.text().await.unwrap_or_default();
            return Err(KnowledgeStoreError::Fatal {
                operation: operation.to_string(),
                message: format!("HTTP {code}: {text}"),
            });
        }
        Err(KnowledgeStoreError::AllAttemptsFailed {
            operation: operation.to_string(),
            last_status,
        })
    }
}

/// `true` when the body looks like an HTML document rather than compiled text.
fn looks_like_html(body: &str) -> bool {
    let trimmed = body.trim_start().to_ascii_lowercase();
    trimmed.starts_with("<!doctype html") || trimmed.starts_with("<html")
}

/// Extracts a list from any of the defensive response shapes the store is known to use:
/// a bare array, `{items: [...]}`, `{data: [...]}`, or a caller-supplied key (e.g. `threads`).
pub(crate) fn extract_list(value: &Value, extra_key: &str) -> Vec<Value> {
    if let Some(arr) = value.as_array() {
        return arr.clone();
    }
    for key in ["items", "data", extra_key] {
        if key.is_empty() {
            continue;
        }
        if let Some(arr) = value.get(key).and_then(Value::as_array) {
            return arr.clone();
        }
    }
    Vec::new()
}
