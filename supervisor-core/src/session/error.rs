use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("read session file: {0}")]
    Read(std::io::Error),
    #[error("parse session file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("write session file: {0}")]
    Write(std::io::Error),
}
