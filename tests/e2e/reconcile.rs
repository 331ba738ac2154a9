//! E2E Scenario: reconciling field edits between the local store and GitHub.

use std::sync::Arc;

use roadmap::github::{MockRemoteClient, RemoteIssue, RepoRef};
use roadmap::issues::{Issue, IssueStatus, IssueStore};
use roadmap::sync::{
    ConflictVerdict, IssueState, ResolutionMode, Selection, SyncField, SyncOptions, SyncOrchestrator,
    SyncOutcome,
};
use roadmap::test_utils::{SyncFixture, TestLogger, synced_pair};

fn orchestrator(fixture: &SyncFixture, remote: &Arc<MockRemoteClient>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        fixture.store.clone(),
        remote.clone(),
        Some(RepoRef::new("acme", "roadmap")),
    )
    .with_lock(fixture.root.clone(), std::time::Duration::from_secs(2))
}

fn single(id: &str) -> Selection {
    Selection::Single(id.to_string())
}

#[test]
fn second_run_without_remote_change_is_idempotent() {
    let log = TestLogger::new("idempotence");
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("Draft").with_id("i1").linked_to(1));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "Final").with_label("docs")]));
    let sync = orchestrator(&fixture, &remote);

    log.step("first sync adopts remote values");
    let first = sync.run(&single("i1"), &SyncOptions::default()).unwrap();
    assert!(first.has_changes());
    assert_eq!(fixture.issue("i1").title, "Final");

    log.step("second sync finds nothing to do");
    let second = sync.run(&single("i1"), &SyncOptions::default()).unwrap();
    log.observe("second", &second.summary);
    assert!(!second.has_changes());
    assert_eq!(second.per_issue[0].outcome, SyncOutcome::NoChange);

    let meta = fixture.issue("i1").sync;
    assert_eq!(meta.sync_count, 2);
    assert_eq!(meta.successful_syncs, 2);
    assert_eq!(meta.sync_history.len(), 2);
    assert!(meta.sync_history.iter().all(|r| r.success));
    log.pass();
}

#[test]
fn dry_run_leaves_store_untouched() {
    let log = TestLogger::new("dry run purity");
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("Local").with_id("i1").linked_to(1));
    let before = fixture.issue("i1");
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "Remote")
        .with_state(IssueState::Closed)]));

    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };
    let report = orchestrator(&fixture, &remote).run(&Selection::AllLinked, &options).unwrap();
    log.observe("report", &report.per_issue);

    assert_eq!(report.per_issue[0].outcome, SyncOutcome::Planned);
    assert_eq!(report.per_issue[0].applied, vec![SyncField::Title, SyncField::Status]);
    assert_eq!(fixture.issue("i1"), before);
    assert_eq!(report.exit_code(), 0);
    log.pass();
}

#[test]
fn local_only_edit_is_kept_and_recorded() {
    let log = TestLogger::new("local-only edit");
    let fixture = SyncFixture::new();
    let base = RemoteIssue::new(1, "A");
    let mut issue = synced_pair("i1", &base);
    issue.title = "B".to_string();
    fixture.add(&issue);
    let remote = Arc::new(MockRemoteClient::new().with_issues([base]));

    let report = orchestrator(&fixture, &remote).run(&single("i1"), &SyncOptions::default()).unwrap();
    let entry = &report.per_issue[0];
    assert_eq!(entry.fields[0].verdict, ConflictVerdict::LocalOnly);
    assert!(entry.applied.is_empty());
    assert_eq!(entry.kept_local, vec![SyncField::Title]);

    let stored = fixture.issue("i1");
    assert_eq!(stored.title, "B");
    let record = stored.sync.last_record().unwrap();
    assert!(record.success);
    assert_eq!(record.local_changes, vec![SyncField::Title]);
    assert!(record.applied.is_empty());
    log.pass();
}

#[test]
fn true_conflict_blocks_until_forced() {
    let log = TestLogger::new("conflict then force-github");
    let fixture = SyncFixture::new();
    let mut issue = synced_pair("i1", &RemoteIssue::new(1, "A"));
    issue.title = "B".to_string();
    fixture.add(&issue);
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "C")]));
    let sync = orchestrator(&fixture, &remote);

    log.step("manual mode blocks");
    let blocked = sync.run(&single("i1"), &SyncOptions::default()).unwrap();
    assert_eq!(blocked.per_issue[0].outcome, SyncOutcome::ConflictBlocked);
    assert_eq!(blocked.per_issue[0].unresolved, vec![SyncField::Title]);
    assert_eq!(blocked.exit_code(), 1);
    let stored = fixture.issue("i1");
    assert_eq!(stored.title, "B");
    assert_eq!(stored.sync.baseline.as_ref().unwrap().title, "A");
    assert!(!stored.sync.last_record().unwrap().success);

    log.step("force-github takes the remote title");
    let forced = sync
        .run(
            &single("i1"),
            &SyncOptions {
                force_github: true,
                ..SyncOptions::default()
            },
        )
        .unwrap();
    assert_eq!(forced.mode, ResolutionMode::ForceGithub);
    assert_eq!(forced.per_issue[0].outcome, SyncOutcome::Applied);
    assert_eq!(forced.summary.conflicts_resolved, 1);
    let stored = fixture.issue("i1");
    assert_eq!(stored.title, "C");
    assert_eq!(stored.sync.conflicts_resolved, 1);
    assert_eq!(stored.sync.baseline.as_ref().unwrap().title, "C");
    log.pass();
}

#[test]
fn force_local_keeps_local_and_advances_baseline() {
    let fixture = SyncFixture::new();
    let mut issue = synced_pair("i1", &RemoteIssue::new(1, "A").with_label("bug"));
    issue.title = "B".to_string();
    issue.status = IssueStatus::InProgress;
    fixture.add(&issue);
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "C").with_label("ui")]));

    let report = orchestrator(&fixture, &remote)
        .run(
            &single("i1"),
            &SyncOptions {
                force_local: true,
                ..SyncOptions::default()
            },
        )
        .unwrap();
    let entry = &report.per_issue[0];
    assert_eq!(entry.applied, vec![SyncField::Labels]);
    assert_eq!(entry.kept_local, vec![SyncField::Title]);

    let stored = fixture.issue("i1");
    assert_eq!(stored.title, "B");
    assert_eq!(stored.labels, vec!["ui".to_string()]);
    assert_eq!(stored.status, IssueStatus::InProgress);
    assert_eq!(stored.sync.baseline.as_ref().unwrap().title, "C");
}

#[test]
fn closed_remote_closes_local_issue() {
    let fixture = SyncFixture::new();
    fixture.add(&synced_pair("i1", &RemoteIssue::new(1, "Ship")));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "Ship")
        .with_state(IssueState::Closed)]));

    orchestrator(&fixture, &remote).run(&single("i1"), &SyncOptions::default()).unwrap();
    assert_eq!(fixture.issue("i1").status, IssueStatus::Closed);
}

#[test]
fn validate_only_checks_existence_without_writes() {
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("a").with_id("a").linked_to(1));
    fixture.add(&Issue::new("b").with_id("b").linked_to(2));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "other")]));

    let report = orchestrator(&fixture, &remote)
        .run(
            &Selection::AllLinked,
            &SyncOptions {
                validate_only: true,
                ..SyncOptions::default()
            },
        )
        .unwrap();
    assert_eq!(report.get("a").unwrap().outcome, SyncOutcome::Validated);
    assert_eq!(report.get("b").unwrap().outcome, SyncOutcome::Skipped);
    assert_eq!(fixture.issue("a").title, "a");
    assert_eq!(fixture.issue("a").sync.sync_count, 0);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn blocked_conflict_applies_nothing_next_to_remote_change() {
    let log = TestLogger::new("blocked conflict beside remote-only field");
    let fixture = SyncFixture::new();
    let mut issue = synced_pair("i1", &RemoteIssue::new(1, "A"));
    issue.title = "B".to_string();
    fixture.add(&issue);
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "C")
        .with_state(IssueState::Closed)]));

    let report = orchestrator(&fixture, &remote).run(&single("i1"), &SyncOptions::default()).unwrap();
    let entry = &report.per_issue[0];
    log.observe("report", entry);
    assert_eq!(entry.outcome, SyncOutcome::ConflictBlocked);
    assert_eq!(entry.unresolved, vec![SyncField::Title]);
    assert!(entry.applied.is_empty());
    assert_eq!(report.summary.fields_applied, 0);

    let stored = fixture.issue("i1");
    assert_eq!(stored.title, "B");
    assert_ne!(stored.status, IssueStatus::Closed);
    log.pass();
}

#[test]
fn declined_forced_sync_resolves_nothing_and_is_recorded() {
    use roadmap::config::AutoSyncPolicy;
    use roadmap::sync::ResolutionPlan;

    let fixture = SyncFixture::new();
    let mut issue = synced_pair("i1", &RemoteIssue::new(1, "A"));
    issue.title = "B".to_string();
    fixture.add(&issue);
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "C")]));
    let decline = |_: &Issue, _: &ResolutionPlan| false;

    let report = orchestrator(&fixture, &remote)
        .with_policy(AutoSyncPolicy {
            confirm_before_sync: true,
            ..AutoSyncPolicy::default()
        })
        .with_confirm(Arc::new(decline))
        .run(
            &single("i1"),
            &SyncOptions {
                force_github: true,
                ..SyncOptions::default()
            },
        )
        .unwrap();

    let entry = &report.per_issue[0];
    assert_eq!(entry.outcome, SyncOutcome::Skipped);
    assert!(entry.resolution.is_none());
    assert!(entry.applied.is_empty());
    assert_eq!(report.summary.conflicts_resolved, 0);

    let stored = fixture.issue("i1");
    assert_eq!(stored.title, "B");
    assert_eq!(stored.sync.sync_count, 1);
    assert_eq!(stored.sync.conflicts_resolved, 0);
    let record = stored.sync.last_record().unwrap();
    assert!(!record.success);
    assert_eq!(record.error_message.as_deref(), Some("declined"));
    assert_eq!(stored.sync.baseline.as_ref().unwrap().title, "A");
}
