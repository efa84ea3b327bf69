//! Single-instance PID file with liveness check (spec §5 "Single-instance").
//!
//! Only a precondition for the file-backed session store's correctness, not a concurrency
//! primitive in its own right: two processes both calling `SessionStore::upsert` on the same
//! `chat_sessions.json` would silently clobber each other's writes.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another instance is already running (pid {0})")]
    AlreadyRunning(u32),
    #[error("read pid file: {0}")]
    Read(std::io::Error),
    #[error("write pid file: {0}")]
    Write(std::io::Error),
}

/// Held for the process lifetime; removes the PID file on drop so a clean shutdown never
/// leaves a stale lock behind.
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Acquires `<base_dir>/supervisor.pid`, refusing to start if the recorded pid is still
    /// alive.
    pub fn acquire(base_dir: &Path) -> Result<Self, LockError> {
        let path = base_dir.join("supervisor.pid");
        if let Some(existing) = read_pid(&path)? {
            if is_alive(existing) {
                return Err(LockError::AlreadyRunning(existing));
            }
        }
        std::fs::write(&path, std::process::id().to_string()).map_err(LockError::Write)?;
        Ok(InstanceLock { path })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn read_pid(path: &Path) -> Result<Option<u32>, LockError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.trim().parse().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LockError::Read(e)),
    }
}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    // kill(pid, 0) sends no signal but still checks for EPERM/ESRCH; either makes a stale lock
    // safe to evict except when we'd be reporting on a live, unreachable process as dead, which
    // kill(0) cannot distinguish from truly-dead — that's an accepted edge case here.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    false
}
