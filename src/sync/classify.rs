//! Three-way classification of differing fields against the sync baseline.

use serde::{Deserialize, Serialize};

use super::diff::FieldDiff;
use super::snapshot::{FieldValue, IssueSnapshot, SyncField};

/// Which side changed a field since the last successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictVerdict {
    LocalOnly,
    RemoteOnly,
    Conflict,
}

impl std::fmt::Display for ConflictVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LocalOnly => "local-only",
            Self::RemoteOnly => "remote-only",
            Self::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// A differing field with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedField {
    pub field: SyncField,
    pub local: FieldValue,
    pub remote: FieldValue,
    pub verdict: ConflictVerdict,
}

/// Every differing field of one issue, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassifiedDiff {
    fields: Vec<ClassifiedField>,
}

impl ClassifiedDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedField> {
        self.fields.iter()
    }

    #[must_use]
    pub fn verdict(&self, field: SyncField) -> Option<ConflictVerdict> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.verdict)
    }

    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.verdict == ConflictVerdict::Conflict)
    }

    pub fn with_verdict(&self, verdict: ConflictVerdict) -> impl Iterator<Item = &ClassifiedField> {
        self.fields.iter().filter(move |f| f.verdict == verdict)
    }
}

/// Label each differing field.
///
/// With no baseline the issue has never synced successfully, and the remote
/// is authoritative: every difference is `RemoteOnly`.
#[must_use]
pub fn classify(diff: &FieldDiff, baseline: Option<&IssueSnapshot>) -> ClassifiedDiff {
    let fields = diff
        .iter()
        .map(|(field, change)| {
            let verdict = baseline.map_or(ConflictVerdict::RemoteOnly, |base| {
                verdict_for(&change.local, &change.remote, &base.value(field))
            });
            ClassifiedField {
                field,
                local: change.local.clone(),
                remote: change.remote.clone(),
                verdict,
            }
        })
        .collect();
    ClassifiedDiff { fields }
}

fn verdict_for(local: &FieldValue, remote: &FieldValue, base: &FieldValue) -> ConflictVerdict {
    let local_changed = local != base;
    let remote_changed = remote != base;
    match (local_changed, remote_changed) {
        (true, false) => ConflictVerdict::LocalOnly,
        (false, true) => ConflictVerdict::RemoteOnly,
        // (false, false) cannot happen for a differing field.
        _ => ConflictVerdict::Conflict,
    }
}
