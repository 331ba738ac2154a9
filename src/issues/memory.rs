//! In-memory issue store.
//!
//! Used by unit and end-to-end tests that exercise the sync engine without
//! touching disk. Supports targeted failure injection so failure isolation
//! can be tested per issue.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::{Result, RoadmapError};
use crate::sync::metadata::SyncMetadata;

use super::store::IssueStore;
use super::types::{FieldSet, Issue, IssueFilter};

/// Which store calls should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailure {
    /// Field updates on this issue fail with an I/O error.
    UpdateFor(String),
    /// Every write fails.
    AllWrites,
}

/// Thread-safe in-memory [`IssueStore`].
#[derive(Debug, Default)]
pub struct MemoryIssueStore {
    issues: Mutex<BTreeMap<String, Issue>>,
    failure: Mutex<Option<StoreFailure>>,
    writes: Mutex<usize>,
}

impl MemoryIssueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with issues.
    #[must_use]
    pub fn with_issues(self, issues: impl IntoIterator<Item = Issue>) -> Self {
        {
            let mut map = self.issues.lock();
            for issue in issues {
                map.insert(issue.id.clone(), issue);
            }
        }
        self
    }

    pub fn inject_failure(&self, failure: StoreFailure) {
        *self.failure.lock() = Some(failure);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    /// Copy of every stored issue, ordered by ID.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Issue> {
        self.issues.lock().values().cloned().collect()
    }

    fn check_failure(&self, id: &str, is_field_update: bool) -> Result<()> {
        match self.failure.lock().as_ref() {
            Some(StoreFailure::AllWrites) => Err(RoadmapError::Io(std::io::Error::other(
                format!("injected write failure for {id}"),
            ))),
            Some(StoreFailure::UpdateFor(target)) if is_field_update && target == id => {
                Err(RoadmapError::Io(std::io::Error::other(format!(
                    "injected update failure for {id}"
                ))))
            }
            _ => Ok(()),
        }
    }

    fn modify<F>(&self, id: &str, is_field_update: bool, f: F) -> Result<Option<Issue>>
    where
        F: FnOnce(&mut Issue),
    {
        self.check_failure(id, is_field_update)?;
        let mut map = self.issues.lock();
        let Some(issue) = map.get_mut(id) else {
            return Ok(None);
        };
        f(issue);
        *self.writes.lock() += 1;
        Ok(Some(issue.clone()))
    }
}

impl IssueStore for MemoryIssueStore {
    fn get(&self, id: &str) -> Result<Option<Issue>> {
        Ok(self.issues.lock().get(id).cloned())
    }

    fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        Ok(self
            .issues
            .lock()
            .values()
            .filter(|issue| filter.matches(issue))
            .cloned()
            .collect())
    }

    fn update(&self, id: &str, fields: &FieldSet) -> Result<Option<Issue>> {
        fields.validate()?;
        self.modify(id, true, |issue| fields.apply_to(issue))
    }

    fn update_sync_metadata(&self, id: &str, metadata: SyncMetadata) -> Result<Option<Issue>> {
        self.modify(id, false, |issue| issue.sync = metadata)
    }

    fn link(&self, id: &str, number: u64) -> Result<Option<Issue>> {
        self.modify(id, false, |issue| {
            issue.github_issue = Some(number);
            issue.sync.github_issue_id = Some(number);
        })
    }

    fn save(&self, issue: &Issue) -> Result<()> {
        issue.validate()?;
        self.check_failure(&issue.id, false)?;
        self.issues.lock().insert(issue.id.clone(), issue.clone());
        *self.writes.lock() += 1;
        Ok(())
    }
}
