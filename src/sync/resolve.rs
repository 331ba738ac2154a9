//! Conflict resolution policy.
//!
//! Turns a classified diff into a plan. Nothing here touches the store; the
//! orchestrator decides whether to execute the plan.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmapError};
use crate::issues::FieldSet;

use super::classify::{ClassifiedDiff, ClassifiedField, ConflictVerdict};
use super::snapshot::{FieldValue, IssueState, SyncField};

/// How two-sided conflicts are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Report conflicts and leave the issue untouched.
    #[default]
    Manual,
    /// Keep the local value.
    ForceLocal,
    /// Take the GitHub value.
    ForceGithub,
}

impl ResolutionMode {
    /// Derive the mode from the two force flags; setting both is an error.
    pub fn from_flags(force_local: bool, force_github: bool) -> Result<Self> {
        match (force_local, force_github) {
            (true, true) => Err(RoadmapError::Config(
                "--force-local and --force-github cannot be used together".to_string(),
            )),
            (true, false) => Ok(Self::ForceLocal),
            (false, true) => Ok(Self::ForceGithub),
            (false, false) => Ok(Self::Manual),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::ForceLocal => "force-local",
            Self::ForceGithub => "force-github",
        }
    }
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflicts that a force mode settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub mode: ResolutionMode,
    pub fields: Vec<SyncField>,
}

impl std::fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.fields.iter().map(SyncField::as_str).collect();
        write!(f, "{} ({})", self.mode, fields.join(", "))
    }
}

/// What to do with each differing field of one issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionPlan {
    /// Fields whose remote value is written into the local issue.
    pub apply: Vec<ClassifiedField>,
    /// Fields where the local value stands.
    pub kept_local: Vec<ClassifiedField>,
    /// Conflicts left for the operator (manual mode only).
    pub unresolved: Vec<ClassifiedField>,
    /// Set when a force mode settled at least one conflict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictResolution>,
}

impl ResolutionPlan {
    /// True when unresolved conflicts prevent applying anything.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.unresolved.is_empty()
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.apply.is_empty()
    }

    #[must_use]
    pub fn conflicts_resolved(&self) -> usize {
        self.resolution.as_ref().map_or(0, |r| r.fields.len())
    }

    /// Store update carrying the remote value of every applied field.
    #[must_use]
    pub fn field_set(&self) -> FieldSet {
        let mut set = FieldSet::new();
        for change in &self.apply {
            write_field(&mut set, change.field, &change.remote);
        }
        set
    }

    #[must_use]
    pub fn applied_fields(&self) -> Vec<SyncField> {
        self.apply.iter().map(|f| f.field).collect()
    }

    #[must_use]
    pub fn unresolved_fields(&self) -> Vec<SyncField> {
        self.unresolved.iter().map(|f| f.field).collect()
    }
}

fn write_field(set: &mut FieldSet, field: SyncField, value: &FieldValue) {
    match (field, value) {
        (SyncField::Title, FieldValue::Text(title)) => set.title = Some(title.clone()),
        (SyncField::Body, v) => set.body = Some(v.as_text().map(String::from)),
        (SyncField::Status, FieldValue::Text(state)) => {
            if let Ok(state) = state.parse::<IssueState>() {
                set.status = Some(state.to_local_status());
            }
        }
        (SyncField::Assignee, v) => set.assignee = Some(v.as_text().map(String::from)),
        (SyncField::Labels, FieldValue::Labels(labels)) => set.labels = Some(labels.clone()),
        (SyncField::Labels, FieldValue::Null) => set.labels = Some(Vec::new()),
        _ => {}
    }
}

/// Build the plan for one issue.
#[must_use]
pub fn resolve(classified: &ClassifiedDiff, mode: ResolutionMode) -> ResolutionPlan {
    let mut plan = ResolutionPlan::default();
    let mut settled = Vec::new();

    for field in classified.iter() {
        match (field.verdict, mode) {
            (ConflictVerdict::RemoteOnly, _) | (ConflictVerdict::Conflict, ResolutionMode::ForceGithub) => {
                plan.apply.push(field.clone());
            }
            (ConflictVerdict::LocalOnly, _) | (ConflictVerdict::Conflict, ResolutionMode::ForceLocal) => {
                plan.kept_local.push(field.clone());
            }
            (ConflictVerdict::Conflict, ResolutionMode::Manual) => {
                plan.unresolved.push(field.clone());
            }
        }
        if field.verdict == ConflictVerdict::Conflict && mode != ResolutionMode::Manual {
            settled.push(field.field);
        }
    }

    if !settled.is_empty() {
        plan.resolution = Some(ConflictResolution {
            mode,
            fields: settled,
        });
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RemoteIssue;
    use crate::issues::{Issue, IssueStatus};
    use crate::sync::classify::classify;
    use crate::sync::diff::compute;
    use crate::sync::snapshot::IssueSnapshot;

    /// Baseline title "A"; local edits title to "B" and adds a label,
    /// remote edits title to "C" and closes the issue.
    fn classified() -> ClassifiedDiff {
        let issue = Issue::new("B").with_id("i").with_label("local").linked_to(1);
        let remote = RemoteIssue::new(1, "C").with_state(IssueState::Closed);
        let base = IssueSnapshot::from_remote(&RemoteIssue::new(1, "A"), "i");
        classify(
            &compute(
                &IssueSnapshot::from_issue(&issue),
                &IssueSnapshot::from_remote(&remote, "i"),
            ),
            Some(&base),
        )
    }

    #[test]
    fn both_force_flags_is_config_error() {
        assert!(matches!(
            ResolutionMode::from_flags(true, true),
            Err(RoadmapError::Config(_))
        ));
        assert_eq!(
            ResolutionMode::from_flags(false, false).unwrap(),
            ResolutionMode::Manual
        );
    }

    #[test]
    fn manual_mode_blocks_conflicts() {
        let plan = resolve(&classified(), ResolutionMode::Manual);
        assert!(plan.is_blocked());
        assert_eq!(plan.unresolved_fields(), vec![SyncField::Title]);
        assert_eq!(plan.applied_fields(), vec![SyncField::Status]);
        assert_eq!(plan.kept_local.len(), 1);
        assert!(plan.resolution.is_none());
    }

    #[test]
    fn force_github_takes_remote_value() {
        let plan = resolve(&classified(), ResolutionMode::ForceGithub);
        assert!(!plan.is_blocked());
        let set = plan.field_set();
        assert_eq!(set.title.as_deref(), Some("C"));
        assert_eq!(set.status, Some(IssueStatus::Closed));
        assert!(set.labels.is_none(), "local-only label change must survive");
        assert_eq!(plan.conflicts_resolved(), 1);
    }

    #[test]
    fn force_local_keeps_local_value() {
        let plan = resolve(&classified(), ResolutionMode::ForceLocal);
        assert!(plan.unresolved.is_empty());
        assert!(plan.field_set().title.is_none());
        assert_eq!(
            plan.resolution.as_ref().map(ToString::to_string).as_deref(),
            Some("force-local (title)")
        );
    }

    #[test]
    fn clearing_optional_fields() {
        let issue = Issue::new("t").with_id("i").with_assignee("alice").linked_to(1);
        let remote = RemoteIssue::new(1, "t");
        let plan = resolve(
            &classify(
                &compute(
                    &IssueSnapshot::from_issue(&issue),
                    &IssueSnapshot::from_remote(&remote, "i"),
                ),
                None,
            ),
            ResolutionMode::Manual,
        );
        assert_eq!(plan.field_set().assignee, Some(None));
    }
}
