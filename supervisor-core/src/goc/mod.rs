//! # GoC Mapping (C4)
//!
//! Maps each job (and each workspace-scoped service, such as the shared "agents" registry
//! thread) onto a knowledge-store thread, a "shared" context set, and a per-doc tracking chain.
//! Provisioning is idempotent and in-flight-deduplicated so concurrent callers never create
//! duplicate threads or context sets; tracking appends chain resources with `NEXT_PART` edges.

mod coordinator;
mod error;
mod types;

pub use coordinator::GocCoordinator;
pub use error::GocError;
pub use types::GocMapping;
