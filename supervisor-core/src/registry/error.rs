use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("knowledge store: {0}")]
    Store(#[from] goc_client::KnowledgeStoreError),
    #[error("goc mapping: {0}")]
    Goc(#[from] crate::goc::GocError),
    #[error("no decodable agent profile in resource {resource_id}")]
    UndecodableProfile { resource_id: String },
    #[error("agent id must be a non-empty slug, got {0:?}")]
    InvalidAgentId(String),
    #[error("blueprint resource {0} not found")]
    BlueprintNotFound(String),
}
