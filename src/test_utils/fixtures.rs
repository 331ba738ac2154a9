use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::github::RemoteIssue;
use crate::issues::{FileIssueStore, Issue, IssueStore};
use crate::sync::IssueSnapshot;

/// Local issue that mirrors `remote` and has already been synced once, so
/// its baseline equals the remote state.
#[must_use]
pub fn synced_pair(id: &str, remote: &RemoteIssue) -> Issue {
    let mut issue = Issue::new(remote.title.clone())
        .with_id(id)
        .linked_to(remote.number);
    issue.body.clone_from(&remote.body);
    issue.status = remote.state.to_local_status();
    issue.assignee = remote.assignee.as_ref().map(|a| a.login.clone());
    issue.labels = remote.label_names();
    issue.sync.baseline = Some(IssueSnapshot::from_remote(remote, id));
    issue
}

/// Isolated roadmap root backed by a [`FileIssueStore`].
pub struct SyncFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub store: Arc<FileIssueStore>,
}

impl SyncFixture {
    /// # Panics
    /// When the temp directory or store cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().join(".roadmap");
        let store = Arc::new(FileIssueStore::open(&root).expect("open issue store"));
        println!("[FIXTURE] roadmap root: {}", root.display());
        Self {
            temp_dir,
            root,
            store,
        }
    }

    /// # Panics
    /// When the issue cannot be written.
    pub fn add(&self, issue: &Issue) {
        self.store.save(issue).expect("save issue");
    }

    /// # Panics
    /// When the issue is missing or unreadable.
    #[must_use]
    pub fn issue(&self, id: &str) -> Issue {
        self.store
            .get(id)
            .expect("read issue")
            .unwrap_or_else(|| panic!("issue {id} missing"))
    }

    /// Write `<root>/config.toml`.
    ///
    /// # Panics
    /// When the file cannot be written.
    pub fn write_config(&self, body: &str) -> PathBuf {
        let path = self.root.join("config.toml");
        std::fs::write(&path, body).expect("write config");
        path
    }
}

impl Default for SyncFixture {
    fn default() -> Self {
        Self::new()
    }
}
