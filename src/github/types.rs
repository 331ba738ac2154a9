//! GitHub issue payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmapError};
use crate::sync::snapshot::IssueState;

/// Owner/name pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoRef {
    type Err = RoadmapError;

    fn from_str(s: &str) -> Result<Self> {
        parse_repo(s)
    }
}

/// Parse `owner/name`, also accepting GitHub URLs and a trailing `.git`.
pub fn parse_repo(input: &str) -> Result<RepoRef> {
    let input = input.trim();
    for prefix in ["https://github.com/", "http://github.com/", "github.com/"] {
        if let Some(stripped) = input.strip_prefix(prefix) {
            return parse_repo(stripped);
        }
    }
    let invalid = || RoadmapError::Config(format!("invalid repository reference: {input:?}"));
    let mut parts = input.split('/');
    let owner = parts.next().unwrap_or("").trim();
    let name = parts.next().unwrap_or("").trim();
    if owner.is_empty() || name.is_empty() {
        return Err(invalid());
    }
    if parts.any(|part| !part.trim().is_empty()) {
        return Err(invalid());
    }
    Ok(RepoRef::new(owner, name.trim_end_matches(".git")))
}

/// A user reference as returned by the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub login: String,
}

/// A label reference as returned by the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLabel {
    pub name: String,
}

/// An issue as returned by `GET /repos/{owner}/{repo}/issues/{number}`.
///
/// Only the fields sync compares are modeled; the rest of the payload is
/// ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub assignee: Option<RemoteUser>,
    #[serde(default)]
    pub labels: Vec<RemoteLabel>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: String,
}

impl RemoteIssue {
    /// Minimal open issue, mostly for fixtures.
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: None,
            state: IssueState::Open,
            assignee: None,
            labels: Vec::new(),
            updated_at: Utc::now(),
            html_url: String::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub const fn with_state(mut self, state: IssueState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_assignee(mut self, login: impl Into<String>) -> Self {
        self.assignee = Some(RemoteUser {
            login: login.into(),
        });
        self
    }

    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>) -> Self {
        self.labels.push(RemoteLabel { name: name.into() });
        self
    }

    /// Label names in API order.
    #[must_use]
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }
}

/// Payload for `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRemoteIssue {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Payload for `PATCH /repos/{owner}/{repo}/issues/{number}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteIssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl RemoteIssuePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.state.is_none()
            && self.assignees.is_none()
            && self.labels.is_none()
    }
}
