use thiserror::Error;

/// Malformed-action errors surfaced to the operator as a per-action `status: error` note; they
/// never abort the run (spec §7, *ValidationError*).
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action missing mandatory field: {0}")]
    MissingField(String),
    #[error("action type not recognized: {0}")]
    UnknownType(String),
}
