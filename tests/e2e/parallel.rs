//! E2E Scenario: batches, worker pool ordering, failure isolation and
//! cancellation.

use std::sync::Arc;
use std::time::Duration;

use roadmap::error::ErrorCode;
use roadmap::github::{MockRemoteClient, RemoteFailure, RemoteIssue, RepoRef};
use roadmap::issues::{Issue, IssueStatus};
use roadmap::sync::{CancelToken, Selection, SyncOptions, SyncOrchestrator, SyncOutcome};
use roadmap::test_utils::{SyncFixture, TestLogger};

fn orchestrator(fixture: &SyncFixture, remote: &Arc<MockRemoteClient>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        fixture.store.clone(),
        remote.clone(),
        Some(RepoRef::new("acme", "roadmap")),
    )
}

fn seed(fixture: &SyncFixture, remote: &MockRemoteClient, ids: &[&str]) {
    for (n, id) in (1u64..).zip(ids) {
        fixture.add(&Issue::new(format!("old {id}")).with_id(*id).linked_to(n));
        remote.insert(RemoteIssue::new(n, format!("new {id}")));
    }
}

#[test]
fn report_follows_selection_order_despite_slow_fetches() {
    let log = TestLogger::new("selection order under parallel fetches");
    let fixture = SyncFixture::new();
    let remote = Arc::new(MockRemoteClient::new());
    let ids = ["a", "b", "c", "d", "e", "f"];
    seed(&fixture, &remote, &ids);
    remote.delay(1, Duration::from_millis(150));
    remote.delay(2, Duration::from_millis(80));

    let options = SyncOptions {
        workers: 4,
        batch_size: 4,
        ..SyncOptions::default()
    };
    let report = orchestrator(&fixture, &remote).run(&Selection::AllLinked, &options).unwrap();
    let order: Vec<&str> = report.per_issue.iter().map(|r| r.issue_id.as_str()).collect();
    log.observe("order", &order);
    assert_eq!(order, ids);
    assert_eq!(report.summary.applied, ids.len());
    for id in ids {
        assert_eq!(fixture.issue(id).title, format!("new {id}"));
    }
    log.pass();
}

#[test]
fn one_failing_issue_does_not_stop_the_batch() {
    let fixture = SyncFixture::new();
    let remote = Arc::new(MockRemoteClient::new());
    seed(&fixture, &remote, &["a", "b", "c"]);
    remote.fail(2, RemoteFailure::Timeout);

    let report = orchestrator(&fixture, &remote)
        .run(&Selection::AllLinked, &SyncOptions::default())
        .unwrap();
    assert_eq!(report.get("a").unwrap().outcome, SyncOutcome::Applied);
    assert_eq!(report.get("b").unwrap().outcome, SyncOutcome::Error);
    assert!(report.get("b").unwrap().remote_access_error);
    assert_eq!(report.get("c").unwrap().outcome, SyncOutcome::Applied);
    assert_eq!(report.exit_code(), 1);

    let failed = fixture.issue("b");
    assert_eq!(failed.title, "old b");
    assert!(failed.sync.baseline.is_none());
    assert!(!failed.sync.last_record().unwrap().success);
}

#[test]
fn cancellation_stops_remaining_issues() {
    let log = TestLogger::new("cancellation");
    let fixture = SyncFixture::new();
    let remote = Arc::new(MockRemoteClient::new());
    let ids = ["a", "b", "c", "d", "e"];
    seed(&fixture, &remote, &ids);

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    remote.on_fetch(move |_| trigger.cancel());

    let options = SyncOptions {
        workers: 1,
        batch_size: 2,
        ..SyncOptions::default()
    };
    let report = orchestrator(&fixture, &remote)
        .with_cancel_token(cancel)
        .run(&Selection::AllLinked, &options)
        .unwrap();
    log.observe("summary", &report.summary);

    assert!(report.interrupted);
    assert_eq!(report.per_issue.len(), ids.len());
    assert_eq!(report.per_issue[0].outcome, SyncOutcome::Applied);
    for entry in &report.per_issue[1..] {
        assert_eq!(entry.outcome, SyncOutcome::Skipped);
        assert_eq!(entry.message.as_deref(), Some("interrupted"));
        assert_eq!(entry.error_code, Some(ErrorCode::SyncInterrupted));
    }
    assert_eq!(remote.call_count(), 1);
    assert_eq!(fixture.issue("e").sync.sync_count, 0);
    assert_eq!(report.exit_code(), 1);
    log.pass();
}

#[test]
fn milestone_selection_skips_unlinked_members() {
    let fixture = SyncFixture::new();
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "linked new")]));
    fixture.add(&Issue::new("linked").with_id("m1").with_milestone("v1").linked_to(1));
    fixture.add(&Issue::new("loose").with_id("m2").with_milestone("v1"));
    fixture.add(&Issue::new("elsewhere").with_id("x1").with_milestone("v2").linked_to(9));

    let report = orchestrator(&fixture, &remote)
        .run(&Selection::Milestone("v1".into()), &SyncOptions::default())
        .unwrap();
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.get("m1").unwrap().outcome, SyncOutcome::Applied);
    assert_eq!(report.get("m2").unwrap().outcome, SyncOutcome::Skipped);
    assert!(report.get("x1").is_none());
    assert_eq!(remote.call_count(), 1);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn status_selection_filters_by_local_status() {
    let fixture = SyncFixture::new();
    let remote = Arc::new(MockRemoteClient::new().with_issues([
        RemoteIssue::new(1, "one"),
        RemoteIssue::new(2, "two"),
    ]));
    fixture.add(&Issue::new("one").with_id("s1").with_status(IssueStatus::Review).linked_to(1));
    fixture.add(&Issue::new("two").with_id("s2").linked_to(2));

    let report = orchestrator(&fixture, &remote)
        .run(&Selection::Status(IssueStatus::Review), &SyncOptions::default())
        .unwrap();
    assert_eq!(report.summary.total, 1);
    assert_eq!(report.per_issue[0].issue_id, "s1");
}
