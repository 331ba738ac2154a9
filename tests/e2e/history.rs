//! E2E Scenario: sync bookkeeping on disk, statistics and the run lock.

use std::sync::Arc;
use std::time::Duration;

use roadmap::RoadmapError;
use roadmap::github::{MockRemoteClient, RemoteIssue, RepoRef};
use roadmap::issues::{Issue, IssueFilter, IssueStore};
use roadmap::sync::{Selection, SyncLock, SyncMetadataService, SyncOptions, SyncOrchestrator, SyncStatus};
use roadmap::test_utils::{SyncFixture, TestLogger};

fn orchestrator(fixture: &SyncFixture, remote: &Arc<MockRemoteClient>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        fixture.store.clone(),
        remote.clone(),
        Some(RepoRef::new("acme", "roadmap")),
    )
}

#[test]
fn history_is_trimmed_to_limit_while_counters_keep_growing() {
    let log = TestLogger::new("rolling history");
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("t").with_id("h1").linked_to(1));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "t")]));
    let sync = orchestrator(&fixture, &remote).with_history_limit(3);

    for _ in 0..5 {
        sync.run(&Selection::Single("h1".into()), &SyncOptions::default()).unwrap();
    }
    let meta = fixture.issue("h1").sync;
    log.observe("history", &meta.sync_history.len());
    assert_eq!(meta.sync_count, 5);
    assert_eq!(meta.successful_syncs, 5);
    assert_eq!(meta.sync_history.len(), 3);
    assert!(
        meta.sync_history
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );
    log.pass();
}

#[test]
fn metadata_is_persisted_under_sync_key() {
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("old").with_id("p1").linked_to(3));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(3, "new")]));
    orchestrator(&fixture, &remote)
        .run(&Selection::AllLinked, &SyncOptions::default())
        .unwrap();

    let raw = std::fs::read_to_string(fixture.store.issues_dir().join("p1.yaml")).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&raw).unwrap();
    assert_eq!(doc["sync"]["sync_count"].as_u64(), Some(1));
    assert_eq!(doc["sync"]["baseline"]["title"].as_str(), Some("new"));
    assert_eq!(doc["sync"]["last_sync_status"].as_str(), Some("success"));

    let reloaded = fixture.issue("p1");
    assert_eq!(reloaded.sync.last_sync_status, Some(SyncStatus::Success));
    assert_eq!(reloaded.sync.github_issue_id, Some(3));
}

#[test]
fn statistics_cover_empty_and_synced_sets() {
    let empty = SyncMetadataService::get_statistics(&[]);
    assert_eq!(empty.issues, 0);
    assert_eq!(empty.total_syncs, 0);
    assert!(empty.success_rate.abs() < f64::EPSILON);
    assert!(empty.last_sync_time.is_none());

    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("a").with_id("a").linked_to(1));
    fixture.add(&Issue::new("b").with_id("b"));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "a")]));
    orchestrator(&fixture, &remote)
        .run(&Selection::AllLinked, &SyncOptions::default())
        .unwrap();

    let issues = fixture.store.list(&IssueFilter::all()).unwrap();
    let stats = SyncMetadataService::get_statistics(&issues);
    assert_eq!(stats.issues, 2);
    assert_eq!(stats.linked_issues, 1);
    assert_eq!(stats.never_synced, 1);
    assert_eq!(stats.total_syncs, 1);
    assert!((stats.success_rate - 100.0).abs() < f64::EPSILON);
    assert!(stats.last_sync_time.is_some());
}

#[test]
fn held_lock_blocks_mutating_runs_only() {
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("a").with_id("a").linked_to(1));
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "b")]));
    let sync = orchestrator(&fixture, &remote).with_lock(fixture.root.clone(), Duration::from_millis(120));

    let held = SyncLock::try_acquire(&fixture.root).unwrap().unwrap();
    let err = sync.run(&Selection::AllLinked, &SyncOptions::default()).unwrap_err();
    assert!(matches!(err, RoadmapError::LockTimeout(_)));
    assert_eq!(remote.call_count(), 0);

    let dry = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };
    assert!(sync.run(&Selection::AllLinked, &dry).is_ok());

    drop(held);
    assert!(sync.run(&Selection::AllLinked, &SyncOptions::default()).is_ok());
    assert_eq!(fixture.issue("a").title, "b");
}

#[test]
fn corrupt_issue_file_is_skipped_by_selection() {
    let fixture = SyncFixture::new();
    fixture.add(&Issue::new("ok").with_id("good").linked_to(1));
    std::fs::write(fixture.store.issues_dir().join("broken.yaml"), "title: [unclosed").unwrap();
    let remote = Arc::new(MockRemoteClient::new().with_issues([RemoteIssue::new(1, "ok")]));

    let report = orchestrator(&fixture, &remote)
        .run(&Selection::AllLinked, &SyncOptions::default())
        .unwrap();
    assert_eq!(report.summary.total, 1);
    assert_eq!(report.per_issue[0].issue_id, "good");
}
