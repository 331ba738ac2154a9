//! In-memory [`RemoteIssueClient`] for tests.
//!
//! Counts every call so tests can assert that nothing reached the remote,
//! and can fail or slow down individual issue numbers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use crate::error::{Result, RoadmapError};

use super::client::RemoteIssueClient;
use super::types::{NewRemoteIssue, RemoteIssue, RemoteIssuePatch, RemoteLabel, RemoteUser, RepoRef};

/// Kind of failure to inject for an issue number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    Transport,
    Timeout,
    AuthFailed,
    Api(u16),
}

impl RemoteFailure {
    fn to_error(&self, number: u64) -> RoadmapError {
        let context = format!("mock error: issue #{number}");
        match self {
            Self::Transport => RoadmapError::Transport(context),
            Self::Timeout => RoadmapError::Timeout(context),
            Self::AuthFailed => RoadmapError::AuthFailed(context),
            Self::Api(status) => RoadmapError::RemoteApi {
                status: *status,
                message: context,
            },
        }
    }
}

type FetchHook = Arc<dyn Fn(u64) + Send + Sync>;

/// Mock remote tracker.
#[derive(Default)]
pub struct MockRemoteClient {
    issues: Mutex<HashMap<u64, RemoteIssue>>,
    failures: Mutex<HashMap<u64, RemoteFailure>>,
    delays: Mutex<HashMap<u64, Duration>>,
    on_fetch: Mutex<Option<FetchHook>>,
    calls: AtomicUsize,
    next_number: AtomicU64,
}

impl std::fmt::Debug for MockRemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRemoteClient")
            .field("issues", &self.issues.lock().len())
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl MockRemoteClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_number: AtomicU64::new(1000),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_issues(self, issues: impl IntoIterator<Item = RemoteIssue>) -> Self {
        for issue in issues {
            self.insert(issue);
        }
        self
    }

    pub fn insert(&self, issue: RemoteIssue) {
        self.issues.lock().insert(issue.number, issue);
    }

    #[must_use]
    pub fn get(&self, number: u64) -> Option<RemoteIssue> {
        self.issues.lock().get(&number).cloned()
    }

    pub fn fail(&self, number: u64, failure: RemoteFailure) {
        self.failures.lock().insert(number, failure);
    }

    pub fn delay(&self, number: u64, delay: Duration) {
        self.delays.lock().insert(number, delay);
    }

    /// Run `hook` at the start of every fetch, before any failure or delay.
    pub fn on_fetch(&self, hook: impl Fn(u64) + Send + Sync + 'static) {
        *self.on_fetch.lock() = Some(Arc::new(hook));
    }

    /// Total calls made through the trait.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, number: u64) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.lock().get(&number).copied() {
            std::thread::sleep(delay);
        }
        match self.failures.lock().get(&number) {
            Some(failure) => Err(failure.to_error(number)),
            None => Ok(()),
        }
    }
}

impl RemoteIssueClient for MockRemoteClient {
    fn fetch(&self, _repo: &RepoRef, number: u64) -> Result<Option<RemoteIssue>> {
        let hook = self.on_fetch.lock().clone();
        if let Some(hook) = hook {
            hook(number);
        }
        self.enter(number)?;
        Ok(self.get(number))
    }

    fn create(&self, _repo: &RepoRef, issue: &NewRemoteIssue) -> Result<RemoteIssue> {
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        self.enter(number)?;
        let created = RemoteIssue {
            number,
            title: issue.title.clone(),
            body: issue.body.clone(),
            state: crate::sync::snapshot::IssueState::Open,
            assignee: issue.assignees.first().map(|login| RemoteUser {
                login: login.clone(),
            }),
            labels: issue
                .labels
                .iter()
                .map(|name| RemoteLabel { name: name.clone() })
                .collect(),
            updated_at: Utc::now(),
            html_url: format!("https://github.com/mock/mock/issues/{number}"),
        };
        self.insert(created.clone());
        Ok(created)
    }

    fn update(
        &self,
        _repo: &RepoRef,
        number: u64,
        patch: &RemoteIssuePatch,
    ) -> Result<RemoteIssue> {
        self.enter(number)?;
        let mut issues = self.issues.lock();
        let issue = issues.get_mut(&number).ok_or(RoadmapError::RemoteApi {
            status: 404,
            message: format!("issue #{number} not found"),
        })?;
        if let Some(title) = &patch.title {
            issue.title.clone_from(title);
        }
        if let Some(body) = &patch.body {
            issue.body = Some(body.clone());
        }
        if let Some(state) = patch.state {
            issue.state = state;
        }
        if let Some(assignees) = &patch.assignees {
            issue.assignee = assignees.first().map(|login| RemoteUser {
                login: login.clone(),
            });
        }
        if let Some(labels) = &patch.labels {
            issue.labels = labels
                .iter()
                .map(|name| RemoteLabel { name: name.clone() })
                .collect();
        }
        issue.updated_at = Utc::now();
        Ok(issue.clone())
    }
}
