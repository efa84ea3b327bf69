use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner call cancelled")]
    Cancelled,
}

impl PlannerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlannerError::Cancelled)
    }
}
