use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("execution cancelled")]
    Cancelled,
    #[error("callback failed: {0}")]
    Callback(String),
    #[error("session store: {0}")]
    Session(#[from] crate::session::SessionError),
}

impl ExecutorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled)
    }
}
