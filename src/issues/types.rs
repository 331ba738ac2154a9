//! Core types for the local issue store.
//!
//! An [`Issue`] is the aggregate persisted on disk. The sync engine never
//! edits it directly: it reads a snapshot projection and hands back a
//! [`FieldSet`] describing exactly which fields to overwrite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmapError};
use crate::sync::metadata::SyncMetadata;

/// Issue status in the local workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    Todo,
    InProgress,
    Blocked,
    Review,
    Closed,
}

impl IssueStatus {
    /// Check if the status represents a terminal state.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Blocked => "blocked",
            Self::Review => "review",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" | "open" => Ok(Self::Todo),
            "in-progress" | "in_progress" | "inprogress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "review" => Ok(Self::Review),
            "closed" | "done" => Ok(Self::Closed),
            _ => Err(format!("unknown issue status: {s}")),
        }
    }
}

/// Priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A locally tracked issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Opaque issue ID (8 hex chars for issues created locally)
    pub id: String,

    /// Issue title
    pub title: String,

    /// Issue description (Markdown)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Current status
    pub status: IssueStatus,

    /// Priority
    #[serde(default)]
    pub priority: Priority,

    /// Milestone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,

    /// Assigned user (GitHub login)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Labels/tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Linked GitHub issue number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_issue: Option<u64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last local update timestamp
    pub updated_at: DateTime<Utc>,

    /// Sync bookkeeping (baseline, counters, history)
    #[serde(default)]
    pub sync: SyncMetadata,
}

impl Issue {
    /// Create a new open issue with a fresh ID.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            id,
            title: title.into(),
            body: None,
            status: IssueStatus::Todo,
            priority: Priority::default(),
            milestone: None,
            assignee: None,
            labels: Vec::new(),
            github_issue: None,
            created_at: now,
            updated_at: now,
            sync: SyncMetadata::default(),
        }
    }

    /// Override the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Link to a GitHub issue number.
    #[must_use]
    pub fn linked_to(mut self, number: u64) -> Self {
        self.github_issue = Some(number);
        self.sync.github_issue_id = Some(number);
        self
    }

    /// Whether the issue has a recorded remote reference.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.github_issue.is_some()
    }

    /// Check the invariants every stored issue must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RoadmapError::InvalidIssue("issue id is empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(RoadmapError::InvalidIssue(format!(
                "issue {} has an empty title",
                self.id
            )));
        }
        Ok(())
    }
}

/// Explicit set of fields to overwrite on an issue.
///
/// `None` leaves a field untouched. For optional fields the inner `Option`
/// is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl FieldSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.status.is_none()
            && self.assignee.is_none()
            && self.labels.is_none()
    }

    /// Names of the fields this set will overwrite.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.title.is_some() {
            names.push("title");
        }
        if self.body.is_some() {
            names.push("body");
        }
        if self.status.is_some() {
            names.push("status");
        }
        if self.assignee.is_some() {
            names.push("assignee");
        }
        if self.labels.is_some() {
            names.push("labels");
        }
        names
    }

    /// Reject values the issue schema does not allow.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(RoadmapError::ValidationFailed(
                    "title cannot be empty".to_string(),
                ));
            }
        }
        if let Some(labels) = &self.labels {
            if labels.iter().any(|l| l.trim().is_empty()) {
                return Err(RoadmapError::ValidationFailed(
                    "labels cannot be empty strings".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Write the fields into `issue` and bump its update timestamp.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(title) = &self.title {
            issue.title.clone_from(title);
        }
        if let Some(body) = &self.body {
            issue.body.clone_from(body);
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(assignee) = &self.assignee {
            issue.assignee.clone_from(assignee);
        }
        if let Some(labels) = &self.labels {
            issue.labels.clone_from(labels);
        }
        if !self.is_empty() {
            issue.updated_at = Utc::now();
        }
    }
}

/// Filter parameters for listing issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub milestone: Option<String>,
    pub linked_only: bool,
}

impl IssueFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn linked() -> Self {
        Self {
            linked_only: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        if self.linked_only && !issue.is_linked() {
            return false;
        }
        if let Some(status) = self.status {
            if issue.status != status {
                return false;
            }
        }
        if let Some(milestone) = &self.milestone {
            if issue.milestone.as_deref() != Some(milestone.as_str()) {
                return false;
            }
        }
        true
    }
}
