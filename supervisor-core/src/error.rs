//! Top-level error aggregation.
//!
//! Each component keeps its own `thiserror` enum; this type composes them for callers (e.g.
//! `supervisor-cli`, `telegram-bot`) that don't care which component failed. Only
//! [`SupervisorError::Cancelled`] is special: per the error taxonomy, cancellation is the one
//! kind the executor and run manager let propagate rather than capturing per-action.

use thiserror::Error;

use crate::action::ActionError;
use crate::executor::ExecutorError;
use crate::goc::GocError;
use crate::job::JobError;
use crate::planner::PlannerError;
use crate::registry::RegistryError;
use crate::run_manager::RunManagerError;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Goc(#[from] GocError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    RunManager(#[from] RunManagerError),
    #[error(transparent)]
    Job(#[from] JobError),

    /// The run was cancelled (replan or hard cancel). Propagates out of the executor and the
    /// run manager's `runChat` callback; the drain loop's `finally` block still runs.
    #[error("run cancelled: {0}")]
    Cancelled(String),
}

impl SupervisorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SupervisorError::Cancelled(_))
            || matches!(self, SupervisorError::Executor(e) if e.is_cancelled())
            || matches!(self, SupervisorError::RunManager(e) if e.is_cancelled())
    }
}
