//! Comparable projections of local and remote issues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::RemoteIssue;
use crate::issues::{Issue, IssueStatus};

/// Open/closed state in the remote tracker's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Local status this state maps to when written back into an issue.
    #[must_use]
    pub const fn to_local_status(self) -> IssueStatus {
        match self {
            Self::Open => IssueStatus::Todo,
            Self::Closed => IssueStatus::Closed,
        }
    }
}

impl From<IssueStatus> for IssueState {
    fn from(status: IssueStatus) -> Self {
        if status.is_closed() {
            Self::Closed
        } else {
            Self::Open
        }
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("unknown issue state: {s}")),
        }
    }
}

/// Fields compared during sync, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncField {
    Title,
    Body,
    Status,
    Assignee,
    Labels,
}

impl SyncField {
    pub const ALL: [Self; 5] = [
        Self::Title,
        Self::Body,
        Self::Status,
        Self::Assignee,
        Self::Labels,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::Status => "status",
            Self::Assignee => "assignee",
            Self::Labels => "labels",
        }
    }
}

impl std::fmt::Display for SyncField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field value taken from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Labels(Vec<String>),
}

impl FieldValue {
    fn from_option(value: Option<&String>) -> Self {
        value.map_or(Self::Null, |v| Self::Text(v.clone()))
    }

    /// Text payload, `None` for `Null` and label sets.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("(none)"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Labels(labels) => write!(f, "[{}]", labels.join(", ")),
        }
    }
}

/// Sort and dedup labels so they compare as sets.
#[must_use]
pub fn canonical_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = labels.into_iter().map(Into::into).collect();
    out.sort();
    out.dedup();
    out
}

/// Point-in-time view of an issue's comparable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub status: IssueState,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub remote_ref: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl IssueSnapshot {
    /// Project a local issue.
    #[must_use]
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            title: issue.title.clone(),
            body: issue.body.clone(),
            status: issue.status.into(),
            assignee: issue.assignee.clone(),
            labels: canonical_labels(issue.labels.iter().cloned()),
            remote_ref: issue.github_issue,
            updated_at: issue.updated_at,
        }
    }

    /// Project a remote issue, keyed by the local issue it is linked to.
    #[must_use]
    pub fn from_remote(remote: &RemoteIssue, local_id: &str) -> Self {
        Self {
            id: local_id.to_string(),
            title: remote.title.clone(),
            body: remote.body.clone(),
            status: remote.state,
            assignee: remote.assignee.as_ref().map(|a| a.login.clone()),
            labels: canonical_labels(remote.labels.iter().map(|l| l.name.clone())),
            remote_ref: Some(remote.number),
            updated_at: remote.updated_at,
        }
    }

    /// Value of one comparable field.
    #[must_use]
    pub fn value(&self, field: SyncField) -> FieldValue {
        match field {
            SyncField::Title => FieldValue::Text(self.title.clone()),
            SyncField::Body => FieldValue::from_option(self.body.as_ref()),
            SyncField::Status => FieldValue::Text(self.status.as_str().to_string()),
            SyncField::Assignee => FieldValue::from_option(self.assignee.as_ref()),
            SyncField::Labels => FieldValue::Labels(canonical_labels(self.labels.iter().cloned())),
        }
    }
}
