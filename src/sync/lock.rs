//! Cross-process guard for mutating sync runs.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, RoadmapError};

/// Who holds the sync lock, written into the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub hostname: String,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Advisory exclusive lock on `<root>/sync.lock`, released on drop.
#[derive(Debug)]
pub struct SyncLock {
    file: File,
    path: PathBuf,
}

impl SyncLock {
    const LOCK_FILENAME: &'static str = "sync.lock";
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    fn open(root: &Path) -> Result<(File, PathBuf)> {
        fs::create_dir_all(root)?;
        let path = root.join(Self::LOCK_FILENAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| RoadmapError::LockFailed(format!("open {}: {e}", path.display())))?;
        Ok((file, path))
    }

    /// Try once without blocking.
    pub fn try_acquire(root: &Path) -> Result<Option<Self>> {
        let (mut file, path) = Self::open(root)?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!("sync lock held by another process");
                return Ok(None);
            }
            Err(e) => return Err(RoadmapError::LockFailed(format!("try lock: {e}"))),
        }

        let holder = serde_json::to_string(&LockHolder::current())?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(holder.as_bytes())?;
        file.sync_all()?;

        debug!(path = %path.display(), "acquired sync lock");
        Ok(Some(Self { file, path }))
    }

    /// Poll until the lock is free or `timeout` elapses.
    pub fn acquire_timeout(root: &Path, timeout: Duration) -> Result<Self> {
        let start = Instant::now();
        loop {
            if let Some(lock) = Self::try_acquire(root)? {
                return Ok(lock);
            }
            if start.elapsed() >= timeout {
                break;
            }
            std::thread::sleep(Self::POLL_INTERVAL);
        }
        let holder = Self::status(root).ok().flatten();
        warn!(elapsed = ?start.elapsed(), ?holder, "timed out waiting for sync lock");
        let detail = holder.map_or_else(
            || "held by another process".to_string(),
            |h| format!("held by pid {} on {} since {}", h.pid, h.hostname, h.acquired_at),
        );
        Err(RoadmapError::LockTimeout(format!(
            "{} after {timeout:?}: {detail}",
            root.join(Self::LOCK_FILENAME).display()
        )))
    }

    /// Read the recorded holder without acquiring.
    pub fn status(root: &Path) -> Result<Option<LockHolder>> {
        let path = root.join(Self::LOCK_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let holder = serde_json::from_str(&content)
            .map_err(|e| RoadmapError::LockFailed(format!("parse lock holder: {e}")))?;
        Ok(Some(holder))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("failed to release sync lock: {e}");
        }
        debug!(path = %self.path.display(), "released sync lock");
    }
}
