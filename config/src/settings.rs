//! Parse the workspace `settings.md` file: a `## Section` / `key: value` subset of markdown,
//! used to seed `JobConfig` defaults. Best-effort — a malformed file is logged and treated as
//! empty rather than failing startup, the same non-fatal posture [`crate::load_and_apply`]
//! takes toward a missing `.env`.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

/// `{section -> {key -> value}}`. The implicit top-level section (before any `## Heading`) is
/// keyed `""`.
pub type Settings = HashMap<String, HashMap<String, String>>;

fn parse_settings_md(content: &str) -> Settings {
    let mut sections: Settings = HashMap::new();
    let mut current = String::new();
    sections.entry(current.clone()).or_default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('<') {
            continue;
        }
        if let Some(heading) = line.strip_prefix("## ") {
            current = heading.trim().to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }
        if line.starts_with('#') {
            // Any other heading level is ignored; this dialect only recognizes `##`.
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_start_matches('-').trim().to_string();
        let value = value.trim().to_string();
        if key.is_empty() {
            continue;
        }
        sections.entry(current.clone()).or_default().insert(key, value);
    }

    sections
}

/// Reads and parses `<base_dir>/settings.md`. A missing file yields an empty map; a file that
/// exists but can't be read is logged and also treated as empty so a broken settings file never
/// blocks startup.
pub fn load_settings(base_dir: &Path) -> Settings {
    let path = base_dir.join("settings.md");
    match std::fs::read_to_string(&path) {
        Ok(content) => parse_settings_md(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read settings.md, continuing with defaults");
            Settings::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_level_and_sectioned_keys() {
        let md = "key1: value1\n\n## Approval\nrequire_for_risk: L3\nrequire_file_write: true\n";
        let settings = parse_settings_md(md);
        assert_eq!(settings.get("").unwrap().get("key1"), Some(&"value1".to_string()));
        assert_eq!(settings.get("Approval").unwrap().get("require_for_risk"), Some(&"L3".to_string()));
        assert_eq!(settings.get("Approval").unwrap().get("require_file_write"), Some(&"true".to_string()));
    }

    #[test]
    fn skips_bullets_and_non_heading_hashes() {
        let md = "## Budget\n- max_actions: 4\n### ignored heading\nmax_actions: 4\n";
        let settings = parse_settings_md(md);
        assert_eq!(settings.get("Budget").unwrap().get("max_actions"), Some(&"4".to_string()));
    }

    #[test]
    fn empty_content_yields_one_empty_top_level_section() {
        let settings = parse_settings_md("");
        assert_eq!(settings.len(), 1);
        assert!(settings.get("").unwrap().is_empty());
    }

    #[test]
    fn load_settings_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings.get(""), Some(&HashMap::new()));
    }

    #[test]
    fn load_settings_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.md"), "## Memory\nmode: goc\n").unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings.get("Memory").unwrap().get("mode"), Some(&"goc".to_string()));
    }
}
