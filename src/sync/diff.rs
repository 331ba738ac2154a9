//! Field-by-field comparison of two snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use super::snapshot::{FieldValue, IssueSnapshot, SyncField};

/// Local and remote values of one differing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub local: FieldValue,
    pub remote: FieldValue,
}

/// Fields whose values differ, ordered by [`SyncField`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldDiff(BTreeMap<SyncField, FieldChange>);

impl FieldDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: SyncField) -> Option<&FieldChange> {
        self.0.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = SyncField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SyncField, &FieldChange)> {
        self.0.iter().map(|(field, change)| (*field, change))
    }
}

/// Compare `local` against `remote`.
///
/// Strings compare exactly; labels compare as sets.
#[must_use]
pub fn compute(local: &IssueSnapshot, remote: &IssueSnapshot) -> FieldDiff {
    let changes = SyncField::ALL
        .into_iter()
        .filter_map(|field| {
            let local_value = local.value(field);
            let remote_value = remote.value(field);
            (local_value != remote_value).then_some((
                field,
                FieldChange {
                    local: local_value,
                    remote: remote_value,
                },
            ))
        })
        .collect();
    FieldDiff(changes)
}
