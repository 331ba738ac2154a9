//! File-backed issue store.
//!
//! One YAML document per issue under `<root>/issues/<id>.yaml`. Writes go
//! through a temp file in the same directory and are renamed into place, so
//! a crash never leaves a half-written issue behind.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, RoadmapError};
use crate::sync::metadata::SyncMetadata;

use super::types::{FieldSet, Issue, IssueFilter};

static ISSUE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]{0,63}$").expect("issue id regex is valid")
});

/// Storage operations the sync engine relies on.
///
/// "Not found" is always `Ok(None)`; errors are reserved for I/O and
/// validation failures.
pub trait IssueStore: Send + Sync {
    /// Get a specific issue by ID.
    fn get(&self, id: &str) -> Result<Option<Issue>>;

    /// List issues matching the filter, ordered by ID.
    fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Overwrite the given fields on an issue.
    fn update(&self, id: &str, fields: &FieldSet) -> Result<Option<Issue>>;

    /// Replace the sync bookkeeping of an issue.
    fn update_sync_metadata(&self, id: &str, metadata: SyncMetadata) -> Result<Option<Issue>>;

    /// Record the GitHub issue number an issue is linked to.
    fn link(&self, id: &str, number: u64) -> Result<Option<Issue>>;

    /// Insert or replace a whole issue.
    fn save(&self, issue: &Issue) -> Result<()>;
}

/// Reject IDs that could escape the issues directory.
pub fn validate_issue_id(id: &str) -> Result<()> {
    if ISSUE_ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(RoadmapError::InvalidIssue(format!("invalid issue id: {id:?}")))
    }
}

/// Issue store persisting YAML files on disk.
#[derive(Debug)]
pub struct FileIssueStore {
    issues_dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_guard: Mutex<()>,
}

impl FileIssueStore {
    /// Open (and create if needed) the store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let issues_dir = root.join("issues");
        std::fs::create_dir_all(&issues_dir)?;
        Ok(Self {
            issues_dir,
            write_guard: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn issues_dir(&self) -> &Path {
        &self.issues_dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.issues_dir.join(format!("{id}.yaml"))
    }

    fn read(&self, path: &Path) -> Result<Issue> {
        let raw = std::fs::read_to_string(path)?;
        let issue: Issue = serde_yaml::from_str(&raw).map_err(|err| {
            RoadmapError::InvalidIssue(format!("parse {}: {err}", path.display()))
        })?;
        Ok(issue)
    }

    fn write(&self, issue: &Issue) -> Result<()> {
        issue.validate()?;
        validate_issue_id(&issue.id)?;
        let rendered = serde_yaml::to_string(issue)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.issues_dir)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(&issue.id))
            .map_err(|err| RoadmapError::Io(err.error))?;
        debug!(issue = %issue.id, "wrote issue file");
        Ok(())
    }

    fn modify<F>(&self, id: &str, f: F) -> Result<Option<Issue>>
    where
        F: FnOnce(&mut Issue) -> Result<()>,
    {
        validate_issue_id(id)?;
        let _guard = self.write_guard.lock();
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let mut issue = self.read(&path)?;
        f(&mut issue)?;
        self.write(&issue)?;
        Ok(Some(issue))
    }
}

impl IssueStore for FileIssueStore {
    fn get(&self, id: &str) -> Result<Option<Issue>> {
        validate_issue_id(id)?;
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for entry in WalkDir::new(&self.issues_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            match self.read(path) {
                Ok(issue) if filter.matches(&issue) => issues.push(issue),
                Ok(_) => {}
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable issue file"),
            }
        }
        issues.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(issues)
    }

    fn update(&self, id: &str, fields: &FieldSet) -> Result<Option<Issue>> {
        fields.validate()?;
        self.modify(id, |issue| {
            fields.apply_to(issue);
            Ok(())
        })
    }

    fn update_sync_metadata(&self, id: &str, metadata: SyncMetadata) -> Result<Option<Issue>> {
        self.modify(id, |issue| {
            issue.sync = metadata;
            Ok(())
        })
    }

    fn link(&self, id: &str, number: u64) -> Result<Option<Issue>> {
        self.modify(id, |issue| {
            issue.github_issue = Some(number);
            issue.sync.github_issue_id = Some(number);
            Ok(())
        })
    }

    fn save(&self, issue: &Issue) -> Result<()> {
        let _guard = self.write_guard.lock();
        self.write(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::IssueStatus;

    fn store() -> (tempfile::TempDir, FileIssueStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIssueStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn get_missing_returns_none() {
        let (_dir, store) = store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn save_then_get() {
        let (_dir, store) = store();
        let issue = Issue::new("First").with_id("abc12345").linked_to(3);
        store.save(&issue).unwrap();
        let loaded = store.get("abc12345").unwrap().unwrap();
        assert_eq!(loaded, issue);
    }

    #[test]
    fn list_filters_and_sorts() {
        let (_dir, store) = store();
        store.save(&Issue::new("B").with_id("bbbb").linked_to(2)).unwrap();
        store.save(&Issue::new("A").with_id("aaaa").linked_to(1)).unwrap();
        store.save(&Issue::new("C").with_id("cccc")).unwrap();

        let linked = store.list(&IssueFilter::linked()).unwrap();
        let ids: Vec<_> = linked.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["aaaa", "bbbb"]);
        assert_eq!(store.list(&IssueFilter::all()).unwrap().len(), 3);
    }

    #[test]
    fn list_skips_corrupt_files() {
        let (_dir, store) = store();
        store.save(&Issue::new("Good").with_id("good")).unwrap();
        std::fs::write(store.issues_dir().join("bad.yaml"), "title: [unterminated").unwrap();
        let issues = store.list(&IssueFilter::all()).unwrap();
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn update_missing_returns_none() {
        let (_dir, store) = store();
        let fields = FieldSet {
            title: Some("x".into()),
            ..FieldSet::default()
        };
        assert!(store.update("ghost", &fields).unwrap().is_none());
    }

    #[test]
    fn update_writes_fields() {
        let (_dir, store) = store();
        store.save(&Issue::new("Old").with_id("u1")).unwrap();
        let fields = FieldSet {
            title: Some("New".into()),
            status: Some(IssueStatus::Closed),
            ..FieldSet::default()
        };
        let updated = store.update("u1", &fields).unwrap().unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(store.get("u1").unwrap().unwrap().status, IssueStatus::Closed);
    }

    #[test]
    fn update_rejects_invalid_fields() {
        let (_dir, store) = store();
        store.save(&Issue::new("Old").with_id("u2")).unwrap();
        let fields = FieldSet {
            title: Some("  ".into()),
            ..FieldSet::default()
        };
        assert!(store.update("u2", &fields).is_err());
        assert_eq!(store.get("u2").unwrap().unwrap().title, "Old");
    }

    #[test]
    fn link_records_number() {
        let (_dir, store) = store();
        store.save(&Issue::new("L").with_id("l1")).unwrap();
        let linked = store.link("l1", 42).unwrap().unwrap();
        assert_eq!(linked.github_issue, Some(42));
        assert_eq!(linked.sync.github_issue_id, Some(42));
    }

    #[test]
    fn rejects_path_traversal_ids() {
        let (_dir, store) = store();
        assert!(store.get("../etc/passwd").is_err());
        assert!(validate_issue_id("ok_id-1").is_ok());
        assert!(validate_issue_id("").is_err());
    }
}
