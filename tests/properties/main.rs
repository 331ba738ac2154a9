//! Property tests for diff classification.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use roadmap::sync::classify::classify;
use roadmap::sync::diff::compute;
use roadmap::sync::{ConflictVerdict, IssueSnapshot, IssueState, SyncField};

fn arb_snapshot() -> impl Strategy<Value = IssueSnapshot> {
    (
        prop::sample::select(vec!["A", "B", "C"]),
        prop::option::of(prop::sample::select(vec!["one", "two"])),
        prop_oneof![Just(IssueState::Open), Just(IssueState::Closed)],
        prop::option::of(prop::sample::select(vec!["kim", "lee"])),
        prop::collection::vec(prop::sample::select(vec!["bug", "docs", "p2"]), 0..3),
    )
        .prop_map(|(title, body, status, assignee, labels)| IssueSnapshot {
            id: "p".to_string(),
            title: title.to_string(),
            body: body.map(String::from),
            status,
            assignee: assignee.map(String::from),
            labels: labels.into_iter().map(String::from).collect(),
            remote_ref: Some(7),
            updated_at: Utc.timestamp_opt(1_750_000_000, 0).unwrap(),
        })
}

fn mirrored(verdict: ConflictVerdict) -> ConflictVerdict {
    match verdict {
        ConflictVerdict::LocalOnly => ConflictVerdict::RemoteOnly,
        ConflictVerdict::RemoteOnly => ConflictVerdict::LocalOnly,
        ConflictVerdict::Conflict => ConflictVerdict::Conflict,
    }
}

proptest! {
    /// Swapping sides swaps LocalOnly and RemoteOnly and keeps conflicts.
    #[test]
    fn classification_is_symmetric(
        local in arb_snapshot(),
        remote in arb_snapshot(),
        base in arb_snapshot(),
    ) {
        let forward = classify(&compute(&local, &remote), Some(&base));
        let backward = classify(&compute(&remote, &local), Some(&base));
        for field in SyncField::ALL {
            prop_assert_eq!(forward.verdict(field).map(mirrored), backward.verdict(field));
        }
    }

    /// Without a baseline every difference is taken from the remote side.
    #[test]
    fn first_sync_is_remote_only(local in arb_snapshot(), remote in arb_snapshot()) {
        let classified = classify(&compute(&local, &remote), None);
        prop_assert!(!classified.has_conflicts());
        prop_assert!(classified.iter().all(|f| f.verdict == ConflictVerdict::RemoteOnly));
    }

    /// A field only counts as a conflict when both sides moved away from the
    /// baseline and disagree.
    #[test]
    fn conflicts_require_both_sides_to_change(
        local in arb_snapshot(),
        remote in arb_snapshot(),
        base in arb_snapshot(),
    ) {
        let classified = classify(&compute(&local, &remote), Some(&base));
        for field in classified.with_verdict(ConflictVerdict::Conflict) {
            prop_assert_ne!(&local.value(field.field), &base.value(field.field));
            prop_assert_ne!(&remote.value(field.field), &base.value(field.field));
            prop_assert_ne!(&field.local, &field.remote);
        }
    }
}
