//! Maps an agent profile's free-text `provider` field onto the closed [`Provider`] enum.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::action::Provider;

fn synonyms() -> &'static HashMap<&'static str, Provider> {
    static MAP: OnceLock<HashMap<&'static str, Provider>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("planner", Provider::Planner),
            ("router", Provider::Planner),
            ("coder", Provider::Coder),
            ("code", Provider::Coder),
            ("engineer", Provider::Coder),
            ("researcher", Provider::Researcher),
            ("research", Provider::Researcher),
        ])
    })
}

/// Resolves a provider key (an agent profile's `provider` field) to a [`Provider`], defaulting
/// to [`Provider::Other`] for anything unrecognized rather than failing the lookup.
pub fn provider_from_key(key: &str) -> Provider {
    synonyms()
        .get(key.trim().to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(Provider::Other)
}
