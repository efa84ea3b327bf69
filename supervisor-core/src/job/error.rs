use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("read job file: {0}")]
    Read(std::io::Error),
    #[error("write job file: {0}")]
    Write(std::io::Error),
    #[error("parse job file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tracking doc name {name:?}, expected {pattern}")]
    InvalidDocName { name: String, pattern: &'static str },
    #[error("job not found: {0}")]
    NotFound(String),
}
