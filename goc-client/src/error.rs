//! Error taxonomy for knowledge-store calls.
//!
//! Mirrors the propagation policy in the supervisor's error design: a
//! [`KnowledgeStoreError::Transient`] means "this attempt's endpoint shape doesn't exist here,
//! try the next one"; callers never see it directly because [`crate::client::KnowledgeStoreClient`]
//! only returns [`KnowledgeStoreError::Fatal`] once every attempt has been exhausted.

use thiserror::Error;

/// Statuses treated as "API surface variant mismatch, try next attempt".
///
/// Broadened beyond the usual retry set (`400`, `422`) to tolerate the store's inconsistent
/// error codes across API generations; kept exactly as the source behaves (see DESIGN.md open
/// question on retryable statuses).
pub const RETRYABLE_STATUSES: &[u16] = &[400, 404, 405, 415, 422, 501];

/// Error from a knowledge-store operation.
#[derive(Debug, Error)]
pub enum KnowledgeStoreError {
    /// All attempts for this operation returned a retryable status or failed to connect.
    #[error("knowledge store: no attempt succeeded for {operation} (last status: {last_status:?})")]
    AllAttemptsFailed {
        operation: String,
        last_status: Option<u16>,
    },

    /// A non-retryable HTTP status or malformed response; aborts only the current action.
    #[error("knowledge store: fatal error in {operation}: {message}")]
    Fatal { operation: String, message: String },

    /// The compiled-context body was an HTML document, almost always a misconfigured base URL
    /// or a proxy intercepting the request. Never returned as compiled text.
    #[error("knowledge store: HTML returned for {operation} — check base URL/proxy (status 502)")]
    HtmlBodyReturned { operation: String },

    /// Transport-level failure (DNS, TLS, connect, timeout).
    #[error("knowledge store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not decode as JSON in the expected shape.
    #[error("knowledge store: failed to decode response for {operation}: {message}")]
    Decode { operation: String, message: String },
}

impl KnowledgeStoreError {
    /// `true` for errors that should show up to the user as a "fatal remote" action result
    /// rather than abort the whole run (per the supervisor's error taxonomy).
    pub fn is_fatal_remote(&self) -> bool {
        matches!(
            self,
            KnowledgeStoreError::Fatal { .. }
                | KnowledgeStoreError::HtmlBodyReturned { .. }
                | KnowledgeStoreError::AllAttemptsFailed { .. }
        )
    }
}
