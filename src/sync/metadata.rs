//! Per-issue sync bookkeeping.
//!
//! Every attempt appends a [`SyncRecord`]; counters are cumulative while the
//! history itself is rolling. The baseline is the remote snapshot from the
//! last successful sync and is replaced, never appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RoadmapError};
use crate::issues::{Issue, IssueStore};

use super::resolve::ConflictResolution;
use super::snapshot::{IssueSnapshot, SyncField};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Outcome of the most recent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Failed => "failed",
        })
    }
}

/// One sync attempt. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// Fields edited locally since the baseline.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_changes: Vec<SyncField>,
    /// Fields edited on GitHub since the baseline.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub github_changes: Vec<SyncField>,
    /// Fields written into the local issue by this attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<SyncField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SyncRecord {
    #[must_use]
    pub fn success() -> Self {
        Self {
            timestamp: Utc::now(),
            success: true,
            local_changes: Vec::new(),
            github_changes: Vec::new(),
            applied: Vec::new(),
            conflict_resolution: None,
            error_message: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::success()
        }
    }

    #[must_use]
    pub fn with_changes(mut self, local: Vec<SyncField>, github: Vec<SyncField>) -> Self {
        self.local_changes = local;
        self.github_changes = github;
        self
    }

    #[must_use]
    pub fn with_applied(mut self, applied: Vec<SyncField>) -> Self {
        self.applied = applied;
        self
    }

    #[must_use]
    pub fn with_resolution(mut self, resolution: Option<ConflictResolution>) -> Self {
        self.conflict_resolution = resolution;
        self
    }

    #[must_use]
    pub fn conflicts_resolved(&self) -> u64 {
        self.conflict_resolution
            .as_ref()
            .map_or(0, |r| r.fields.len() as u64)
    }
}

/// Sync state stored on each issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_issue_id: Option<u64>,
    pub sync_count: u64,
    pub successful_syncs: u64,
    pub conflicts_resolved: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_status: Option<SyncStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<IssueSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sync_history: Vec<SyncRecord>,
}

impl SyncMetadata {
    /// True until the first successful sync stores a baseline.
    #[must_use]
    pub const fn is_first_sync(&self) -> bool {
        self.baseline.is_none()
    }

    #[must_use]
    pub fn failed_syncs(&self) -> u64 {
        self.sync_count.saturating_sub(self.successful_syncs)
    }

    /// Percentage of attempts that succeeded, 0 with no attempts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.sync_count == 0 {
            0.0
        } else {
            self.successful_syncs as f64 / self.sync_count as f64 * 100.0
        }
    }

    /// Append an attempt and update counters.
    ///
    /// On success the baseline is replaced by `baseline` when one is given.
    /// History keeps at most `history_limit` records, oldest dropped first.
    pub fn record(&mut self, record: SyncRecord, baseline: Option<IssueSnapshot>, history_limit: usize) {
        self.sync_count += 1;
        self.last_sync_time = Some(record.timestamp);
        if record.success {
            self.successful_syncs += 1;
            self.conflicts_resolved += record.conflicts_resolved();
            self.last_sync_status = Some(SyncStatus::Success);
            if baseline.is_some() {
                self.baseline = baseline;
            }
        } else {
            self.last_sync_status = Some(SyncStatus::Failed);
        }
        self.sync_history.push(record);
        let limit = history_limit.max(1);
        if self.sync_history.len() > limit {
            let excess = self.sync_history.len() - limit;
            self.sync_history.drain(..excess);
        }
    }

    #[must_use]
    pub fn last_record(&self) -> Option<&SyncRecord> {
        self.sync_history.last()
    }
}

/// Aggregate sync statistics over a set of issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatistics {
    pub issues: usize,
    pub linked_issues: usize,
    pub never_synced: usize,
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub conflicts_resolved: u64,
    pub success_rate: f64,
    pub conflict_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Records attempts through the issue store and derives statistics.
pub struct SyncMetadataService<'a> {
    store: &'a dyn IssueStore,
    history_limit: usize,
}

impl<'a> SyncMetadataService<'a> {
    pub fn new(store: &'a dyn IssueStore, history_limit: usize) -> Self {
        Self {
            store,
            history_limit,
        }
    }

    /// Append `record` to the issue's history and persist the metadata.
    pub fn record(
        &self,
        issue_id: &str,
        record: SyncRecord,
        baseline: Option<IssueSnapshot>,
    ) -> Result<SyncMetadata> {
        let issue = self
            .store
            .get(issue_id)?
            .ok_or_else(|| RoadmapError::IssueNotFound(issue_id.to_string()))?;
        let mut metadata = issue.sync;
        if metadata.github_issue_id.is_none() {
            metadata.github_issue_id = issue.github_issue;
        }
        debug!(
            issue = issue_id,
            success = record.success,
            attempt = metadata.sync_count + 1,
            "recording sync attempt"
        );
        metadata.record(record, baseline, self.history_limit);
        self.store
            .update_sync_metadata(issue_id, metadata.clone())?
            .ok_or_else(|| RoadmapError::IssueNotFound(issue_id.to_string()))?;
        Ok(metadata)
    }

    /// Aggregate statistics across `issues`. An empty set yields zeroes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get_statistics(issues: &[Issue]) -> SyncStatistics {
        let mut stats = SyncStatistics {
            issues: issues.len(),
            ..SyncStatistics::default()
        };
        for issue in issues {
            let meta = &issue.sync;
            if issue.is_linked() {
                stats.linked_issues += 1;
            }
            if meta.sync_count == 0 {
                stats.never_synced += 1;
            }
            stats.total_syncs += meta.sync_count;
            stats.successful_syncs += meta.successful_syncs;
            stats.failed_syncs += meta.failed_syncs();
            stats.conflicts_resolved += meta.conflicts_resolved;
            stats.last_sync_time = stats.last_sync_time.max(meta.last_sync_time);
        }
        if stats.total_syncs > 0 {
            let total = stats.total_syncs as f64;
            stats.success_rate = stats.successful_syncs as f64 / total * 100.0;
            stats.conflict_rate = stats.conflicts_resolved as f64 / total * 100.0;
        }
        stats
    }
}
