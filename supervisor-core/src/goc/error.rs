use thiserror::Error;

#[derive(Debug, Error)]
pub enum GocError {
    #[error("knowledge store: {0}")]
    Store(#[from] goc_client::KnowledgeStoreError),
    #[error("read goc mapping file: {0}")]
    Read(std::io::Error),
    #[error("write goc mapping file: {0}")]
    Write(std::io::Error),
    #[error("parse goc mapping file: {0}")]
    Parse(#[from] serde_json::Error),
}
