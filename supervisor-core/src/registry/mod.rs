//! # Agent Registry (C5)
//!
//! Loads the agent catalog from the knowledge store's "agents" service thread, with a
//! local static fallback; creates and updates agent profiles as append-only `NEXT_PART` chains;
//! and installs blueprints from the public agent library.
//!
//! | Item | Role |
//! |------|------|
//! | [`AgentRegistry::load_agents_from_goc`] | Read path: decode + dedupe + optional compiled-context overlay. |
//! | [`AgentWriter::upsert_agent_profile`] | Write path: append-only profile chain. |
//! | [`AgentWriter::install_from_public_library`] | Blueprint resolution + defaults + origin stamping. |
//! | [`yaml_subset`] | Restricted YAML dialect accepted alongside JSON in profile bodies. |

mod decode;
mod error;
mod loader;
mod provider;
mod types;
mod upsert;
mod yaml_subset;

pub use error::RegistryError;
pub use loader::AgentRegistry;
pub use provider::provider_from_key;
pub use types::{AgentCatalog, AgentOrigin, AgentProfile, JobConfig, Tool};
pub use upsert::AgentWriter;
pub use yaml_subset::parse_yaml_subset;
