//! Tracking markdown files (`plan.md`, `research.md`, `progress.md`, `decisions.md`) and their
//! fan-out to the knowledge store (spec §4.9).

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::goc::GocCoordinator;

use super::error::JobError;
use super::types::TRACKING_DOCS;

fn doc_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+\.md$").unwrap())
}

fn validate_doc_name(name: &str) -> Result<(), JobError> {
    if doc_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(JobError::InvalidDocName { name: name.to_string(), pattern: r"^[A-Za-z0-9._-]+\.md$" })
    }
}

fn doc_path(job_dir: &Path, name: &str) -> std::path::PathBuf {
    job_dir.join("shared").join(name)
}

/// Creates any of `names` that don't already exist under `<job_dir>/shared/`, each seeded with
/// a title header and a created-at timestamp. Defaults to [`TRACKING_DOCS`] when `names` is
/// empty.
pub async fn init(job_dir: &Path, names: &[&str]) -> Result<(), JobError> {
    let names: &[&str] = if names.is_empty() { TRACKING_DOCS } else { names };
    for name in names {
        validate_doc_name(name)?;
        let path = doc_path(job_dir, name);
        if tokio::fs::try_exists(&path).await.map_err(JobError::Read)? {
            continue;
        }
        let title = name.trim_end_matches(".md");
        let header = format!(
            "# {title}\n\ncreated: {}\n",
            chrono::Utc::now().to_rfc3339()
        );
        tokio::fs::write(&path, header).await.map_err(JobError::Write)?;
    }
    Ok(())
}

/// Appends a separator block and `markdown` to `<job_dir>/shared/<name>`, then fires the
/// (errors-swallowed) knowledge-store append hook. The local file is authoritative; a
/// knowledge-store outage never blocks or loses a tracking append.
pub async fn append(
    job_dir: &Path,
    name: &str,
    markdown: &str,
    at: chrono::DateTime<chrono::Utc>,
    goc: Option<&GocCoordinator>,
) -> Result<(), JobError> {
    validate_doc_name(name)?;
    let path = doc_path(job_dir, name);
    if !tokio::fs::try_exists(&path).await.map_err(JobError::Read)? {
        init(job_dir, &[name]).await?;
    }

    let block = format!("\n---\n{}\n\n{markdown}\n", at.to_rfc3339());
    let mut existing = tokio::fs::read_to_string(&path).await.map_err(JobError::Read)?;
    existing.push_str(&block);
    tokio::fs::write(&path, &existing).await.map_err(JobError::Write)?;

    if let Some(goc) = goc {
        goc.append_hook(job_dir, name, markdown, at).await;
    }
    Ok(())
}
