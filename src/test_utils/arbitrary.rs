use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use crate::sync::{IssueSnapshot, IssueState};

pub fn arb_state() -> impl Strategy<Value = IssueState> {
    prop_oneof![Just(IssueState::Open), Just(IssueState::Closed)]
}

/// Snapshots drawn from a small value space so fields collide often.
pub fn arb_snapshot() -> impl Strategy<Value = IssueSnapshot> {
    (
        prop::sample::select(vec!["A", "B", "C"]),
        prop::option::of(prop::sample::select(vec!["x", "y"])),
        arb_state(),
        prop::option::of(prop::sample::select(vec!["ana", "bo"])),
        prop::collection::vec(prop::sample::select(vec!["bug", "ui", "p1"]), 0..3),
    )
        .prop_map(|(title, body, status, assignee, labels)| IssueSnapshot {
            id: "prop".to_string(),
            title: title.to_string(),
            body: body.map(String::from),
            status,
            assignee: assignee.map(String::from),
            labels: labels.into_iter().map(String::from).collect(),
            remote_ref: Some(1),
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::classify::classify;
    use crate::sync::diff::compute;
    use crate::sync::resolve::{ResolutionMode, resolve};

    fn arb_mode() -> impl Strategy<Value = ResolutionMode> {
        prop_oneof![
            Just(ResolutionMode::Manual),
            Just(ResolutionMode::ForceLocal),
            Just(ResolutionMode::ForceGithub),
        ]
    }

    proptest! {
        #[test]
        fn plan_partitions_differing_fields(
            local in arb_snapshot(),
            remote in arb_snapshot(),
            base in prop::option::of(arb_snapshot()),
            mode in arb_mode(),
        ) {
            let classified = classify(&compute(&local, &remote), base.as_ref());
            let plan = resolve(&classified, mode);
            let total = plan.apply.len() + plan.kept_local.len() + plan.unresolved.len();
            prop_assert_eq!(total, classified.iter().count());
            if mode != ResolutionMode::Manual {
                prop_assert!(!plan.is_blocked());
            }
            prop_assert_eq!(plan.field_set().is_empty(), !plan.has_changes());
        }

        #[test]
        fn identical_snapshots_never_differ(snapshot in arb_snapshot(), base in prop::option::of(arb_snapshot())) {
            let classified = classify(&compute(&snapshot, &snapshot), base.as_ref());
            prop_assert!(classified.is_empty());
        }
    }
}
