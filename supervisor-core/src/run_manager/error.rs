use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunManagerError {
    #[error("session store: {0}")]
    Session(#[from] crate::session::SessionError),
    #[error("run cancelled")]
    Cancelled,
    #[error("run failed: {0}")]
    RunFailed(String),
}

impl RunManagerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunManagerError::Cancelled)
    }
}
