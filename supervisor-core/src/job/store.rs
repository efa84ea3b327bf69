//! Job directory lifecycle: creation, `conversation.jsonl` append/tail (spec §4.9).

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::error::JobError;
use super::types::{ConversationEntry, JobMeta};

fn job_dir(runs_dir: &Path, job_id: &str) -> PathBuf {
    runs_dir.join(job_id)
}

/// Allocates a new job id, creates `<runsDir>/<jobId>/{shared/,meta.json,job.log}`.
pub async fn create_job(
    runs_dir: &Path,
    title: &str,
    owner_user_id: &str,
    owner_chat_id: &str,
) -> Result<JobMeta, JobError> {
    let job_id = uuid::Uuid::new_v4().to_string();
    let dir = job_dir(runs_dir, &job_id);
    tokio::fs::create_dir_all(dir.join("shared")).await.map_err(JobError::Write)?;

    let meta = JobMeta::new(&job_id, title, owner_user_id, owner_chat_id);
    let json = serde_json::to_string_pretty(&meta)?;
    tokio::fs::write(dir.join("meta.json"), json).await.map_err(JobError::Write)?;
    tokio::fs::write(dir.join("job.log"), b"").await.map_err(JobError::Write)?;
    Ok(meta)
}

pub async fn load_job_meta(runs_dir: &Path, job_id: &str) -> Result<JobMeta, JobError> {
    let path = job_dir(runs_dir, job_id).join("meta.json");
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JobError::NotFound(job_id.to_string()))
        }
        Err(e) => return Err(JobError::Read(e)),
    };
    Ok(serde_json::from_str(&content)?)
}

/// Appends one JSON object per line to `conversation.jsonl`.
pub async fn append_conversation(
    runs_dir: &Path,
    job_id: &str,
    role: &str,
    text: &str,
    meta: serde_json::Value,
) -> Result<(), JobError> {
    let entry = ConversationEntry {
        ts: chrono::Utc::now(),
        role: role.to_string(),
        text: text.to_string(),
        meta,
    };
    let line = serde_json::to_string(&entry)?;
    let path = job_dir(runs_dir, job_id).join("conversation.jsonl");
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(JobError::Write)?;
    file.write_all(line.as_bytes()).await.map_err(JobError::Write)?;
    file.write_all(b"\n").await.map_err(JobError::Write)?;
    Ok(())
}

/// Reads the last `n` valid JSON lines of `conversation.jsonl`, skipping corrupt ones (a crash
/// mid-write can leave a torn final line; that line is dropped rather than failing the tail).
pub async fn tail_conversation(
    runs_dir: &Path,
    job_id: &str,
    n: usize,
) -> Result<Vec<ConversationEntry>, JobError> {
    let path = job_dir(runs_dir, job_id).join("conversation.jsonl");
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(JobError::Read(e)),
    };

    let entries: Vec<ConversationEntry> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    let start = entries.len().saturating_sub(n);
    Ok(entries[start..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_job_lays_out_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let meta = create_job(dir.path(), "investigate flakiness", "u1", "c1").await.unwrap();
        let job_root = dir.path().join(&meta.job_id);
        assert!(job_root.join("shared").is_dir());
        assert!(job_root.join("meta.json").is_file());
        assert!(job_root.join("job.log").is_file());
        assert_eq!(meta.title, "investigate flakiness");
    }

    #[tokio::test]
    async fn load_job_meta_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let created = create_job(dir.path(), "t", "u1", "c1").await.unwrap();
        let loaded = load_job_meta(dir.path(), &created.job_id).await.unwrap();
        assert_eq!(loaded.job_id, created.job_id);
    }

    #[tokio::test]
    async fn load_job_meta_missing_job_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_job_meta(dir.path(), "nope").await.unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
    }

    #[tokio::test]
    async fn append_and_tail_conversation_round_trip_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let meta = create_job(dir.path(), "t", "u1", "c1").await.unwrap();
        append_conversation(dir.path(), &meta.job_id, "user", "hello", json!({})).await.unwrap();
        append_conversation(dir.path(), &meta.job_id, "agent", "hi there", json!({"agent_id": "researcher"})).await.unwrap();

        let tail = tail_conversation(dir.path(), &meta.job_id, 10).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].text, "hello");
        assert_eq!(tail[1].text, "hi there");
    }

    #[tokio::test]
    async fn tail_conversation_respects_limit_and_skips_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let meta = create_job(dir.path(), "t", "u1", "c1").await.unwrap();
        for i in 0..5 {
            append_conversation(dir.path(), &meta.job_id, "user", &format!("msg{i}"), json!({})).await.unwrap();
        }
        let path = job_dir(dir.path(), &meta.job_id).join("conversation.jsonl");
        let mut file = tokio::fs::OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(b"{not valid json\n").await.unwrap();

        let tail = tail_conversation(dir.path(), &meta.job_id, 3).await.unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].text, "msg2");
        assert_eq!(tail[2].text, "msg4");
    }

    #[tokio::test]
    async fn tail_conversation_on_missing_job_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tail = tail_conversation(dir.path(), "nope", 5).await.unwrap();
        assert!(tail.is_empty());
    }
}
