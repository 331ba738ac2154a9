//! Sync orchestration.
//!
//! Selection happens up front. Each batch is fetched, diffed, classified and
//! planned on a pool of scoped worker threads; results flow back over a
//! channel to the coordinating thread, which is the only place that writes
//! to the store. Reports are slotted by selection index so output order does
//! not depend on which fetch finished first.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use indicatif::ProgressBar;
use itertools::Itertools;
use tracing::{debug, info, info_span, warn};

use crate::config::AutoSyncPolicy;
use crate::error::{Result, RoadmapError};
use crate::github::{RemoteIssueClient, RepoRef};
use crate::issues::{Issue, IssueFilter, IssueStatus, IssueStore};

use super::classify::{self, ClassifiedDiff, ConflictVerdict};
use super::diff;
use super::lock::SyncLock;
use super::metadata::{DEFAULT_HISTORY_LIMIT, SyncMetadataService, SyncRecord};
use super::report::{IssueReport, SyncOutcome, SyncReport};
use super::resolve::{self, ResolutionMode, ResolutionPlan};
use super::snapshot::{IssueSnapshot, SyncField};

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Which issues a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(String),
    AllLinked,
    Milestone(String),
    Status(IssueStatus),
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(id) => write!(f, "issue {id}"),
            Self::AllLinked => f.write_str("all linked issues"),
            Self::Milestone(name) => write!(f, "milestone {name}"),
            Self::Status(status) => write!(f, "status {status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub verbose: bool,
    pub force_local: bool,
    pub force_github: bool,
    pub validate_only: bool,
    pub auto_confirm: bool,
    pub workers: usize,
    pub batch_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verbose: false,
            force_local: false,
            force_github: false,
            validate_only: false,
            auto_confirm: false,
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SyncOptions {
    /// Mode from explicit flags, falling back to the policy defaults.
    pub fn resolution_mode(&self, policy: &AutoSyncPolicy) -> Result<ResolutionMode> {
        if self.force_local || self.force_github {
            ResolutionMode::from_flags(self.force_local, self.force_github)
        } else {
            policy.resolution_mode()
        }
    }

    const fn mutates(&self) -> bool {
        !self.dry_run && !self.validate_only
    }
}

/// Cooperative cancellation flag shared with the worker pool.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Cancel on the first Ctrl-C; exit with 130 on the second.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let token = self.clone();
        std::thread::Builder::new()
            .name("roadmap-signal".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        warn!("signal handler unavailable: {err}");
                        return;
                    }
                };
                runtime.block_on(async {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("interrupt received, finishing in-flight issues");
                        token.cancel();
                    }
                    if tokio::signal::ctrl_c().await.is_ok() {
                        std::process::exit(130);
                    }
                });
            })?;
        Ok(())
    }
}

/// Asks the operator before changes are applied to an issue.
pub trait Confirm: Send + Sync {
    fn confirm(&self, issue: &Issue, plan: &ResolutionPlan) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&Issue, &ResolutionPlan) -> bool + Send + Sync,
{
    fn confirm(&self, issue: &Issue, plan: &ResolutionPlan) -> bool {
        self(issue, plan)
    }
}

/// Read-only work done by a pool worker for one issue.
enum Assessed {
    Unlinked,
    Interrupted,
    RemoteMissing(u64),
    Validated(u64),
    Failed(RoadmapError),
    Ready(Box<Assessment>),
}

struct Assessment {
    remote: IssueSnapshot,
    classified: ClassifiedDiff,
    plan: ResolutionPlan,
}

#[derive(Debug, Clone)]
struct LockSettings {
    root: PathBuf,
    timeout: Duration,
}

/// Drives a sync run.
pub struct SyncOrchestrator {
    store: Arc<dyn IssueStore>,
    remote: Arc<dyn RemoteIssueClient>,
    repo: Option<RepoRef>,
    policy: AutoSyncPolicy,
    history_limit: usize,
    lock: Option<LockSettings>,
    cancel: CancelToken,
    confirm: Option<Arc<dyn Confirm>>,
    progress: ProgressBar,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn IssueStore>,
        remote: Arc<dyn RemoteIssueClient>,
        repo: Option<RepoRef>,
    ) -> Self {
        Self {
            store,
            remote,
            repo,
            policy: AutoSyncPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            lock: None,
            cancel: CancelToken::new(),
            confirm: None,
            progress: ProgressBar::hidden(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AutoSyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Guard mutating runs with `<root>/sync.lock`.
    #[must_use]
    pub fn with_lock(mut self, root: impl Into<PathBuf>, timeout: Duration) -> Self {
        self.lock = Some(LockSettings {
            root: root.into(),
            timeout,
        });
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run a sync over `selection`.
    ///
    /// Configuration problems fail the whole run before any remote call.
    /// Everything after that is isolated per issue and lands in the report.
    pub fn run(&self, selection: &Selection, options: &SyncOptions) -> Result<SyncReport> {
        let started = Instant::now();
        let mode = options.resolution_mode(&self.policy)?;
        let repo = self
            .repo
            .clone()
            .ok_or_else(|| RoadmapError::MissingConfig("github.repo".to_string()))?;
        if options.workers == 0 {
            return Err(RoadmapError::Config("--workers must be at least 1".to_string()));
        }
        if options.batch_size == 0 {
            return Err(RoadmapError::Config("--batch-size must be at least 1".to_string()));
        }

        let span = info_span!("sync", %repo, %selection, %mode, dry_run = options.dry_run);
        let _enter = span.enter();

        let _lock = match &self.lock {
            Some(lock) if options.mutates() => Some(SyncLock::acquire_timeout(&lock.root, lock.timeout)?),
            _ => None,
        };

        let issues = match self.select(selection)? {
            Ok(issues) => issues,
            Err(missing) => {
                let mut report = SyncReport::new(vec![missing], mode, options.dry_run, options.validate_only);
                report.duration_ms = started.elapsed().as_millis();
                return Ok(report);
            }
        };
        info!(count = issues.len(), "selected issues");

        self.progress.set_length(issues.len() as u64);
        let mut slots: Vec<Option<IssueReport>> = vec![None; issues.len()];
        let mut offset = 0;
        for batch in issues.chunks(options.batch_size) {
            if self.cancel.is_cancelled() {
                for (i, issue) in batch.iter().enumerate() {
                    slots[offset + i] = Some(interrupted(issue));
                }
            } else {
                debug!(offset, size = batch.len(), "processing batch");
                self.process_batch(batch, offset, &repo, mode, options, &mut slots);
            }
            offset += batch.len();
        }
        self.progress.finish_and_clear();

        let per_issue = slots
            .into_iter()
            .zip(&issues)
            .map(|(slot, issue)| slot.unwrap_or_else(|| interrupted(issue)))
            .collect();
        let mut report = SyncReport::new(per_issue, mode, options.dry_run, options.validate_only);
        report.interrupted = self.cancel.is_cancelled();
        report.duration_ms = started.elapsed().as_millis();
        info!(summary = %report.summary_line(), "sync finished");
        Ok(report)
    }

    /// Issues to process, or the skip report for a single missing issue.
    fn select(&self, selection: &Selection) -> Result<std::result::Result<Vec<Issue>, IssueReport>> {
        let issues = match selection {
            Selection::Single(id) => match self.store.get(id)? {
                Some(issue) => vec![issue],
                None => {
                    return Ok(Err(IssueReport::skipped(id.clone(), "issue not found locally")));
                }
            },
            Selection::AllLinked => self.store.list(&IssueFilter::linked())?,
            Selection::Milestone(name) => self.store.list(&IssueFilter {
                milestone: Some(name.clone()),
                ..IssueFilter::default()
            })?,
            Selection::Status(status) => self.store.list(&IssueFilter {
                status: Some(*status),
                ..IssueFilter::default()
            })?,
        };
        Ok(Ok(issues))
    }

    fn process_batch(
        &self,
        batch: &[Issue],
        offset: usize,
        repo: &RepoRef,
        mode: ResolutionMode,
        options: &SyncOptions,
        slots: &mut [Option<IssueReport>],
    ) {
        let (job_tx, job_rx) = unbounded::<(usize, &Issue)>();
        let (result_tx, result_rx) = unbounded::<(usize, Assessed)>();
        for (i, issue) in batch.iter().enumerate() {
            // The receiver outlives this loop, so sending cannot fail.
            let _ = job_tx.send((i, issue));
        }
        drop(job_tx);

        std::thread::scope(|scope| {
            for _ in 0..options.workers.min(batch.len()) {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (i, issue) in &job_rx {
                        let assessed = if self.cancel.is_cancelled() {
                            Assessed::Interrupted
                        } else {
                            self.assess(issue, repo, mode, options)
                        };
                        if result_tx.send((i, assessed)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (i, assessed) in &result_rx {
                let report = self.apply(&batch[i], assessed, options);
                self.progress.inc(1);
                slots[offset + i] = Some(report);
            }
        });
    }

    /// Fetch, diff, classify and plan. Never writes.
    fn assess(&self, issue: &Issue, repo: &RepoRef, mode: ResolutionMode, options: &SyncOptions) -> Assessed {
        let Some(number) = issue.github_issue else {
            return Assessed::Unlinked;
        };
        if options.validate_only {
            return match self.remote.exists(repo, number) {
                Ok(true) => Assessed::Validated(number),
                Ok(false) => Assessed::RemoteMissing(number),
                Err(err) => Assessed::Failed(err),
            };
        }
        let remote = match self.remote.fetch(repo, number) {
            Ok(Some(remote)) => remote,
            Ok(None) => return Assessed::RemoteMissing(number),
            Err(err) => return Assessed::Failed(err),
        };
        let local = IssueSnapshot::from_issue(issue);
        let remote = IssueSnapshot::from_remote(&remote, &issue.id);
        let field_diff = diff::compute(&local, &remote);
        let classified = classify::classify(&field_diff, issue.sync.baseline.as_ref());
        let plan = resolve::resolve(&classified, mode);
        debug!(
            issue = %issue.id,
            differing = field_diff.len(),
            first_sync = issue.sync.is_first_sync(),
            blocked = plan.is_blocked(),
            "assessed issue"
        );
        Assessed::Ready(Box::new(Assessment {
            remote,
            classified,
            plan,
        }))
    }

    /// Turn an assessment into store writes and a report. Runs on the
    /// coordinating thread only.
    fn apply(&self, issue: &Issue, assessed: Assessed, options: &SyncOptions) -> IssueReport {
        let base = IssueReport::new(issue.id.clone(), SyncOutcome::NoChange)
            .with_issue(issue.github_issue, &issue.title);
        match assessed {
            Assessed::Unlinked => {
                let err = RoadmapError::NotLinked(issue.id.clone());
                IssueReport {
                    outcome: SyncOutcome::Skipped,
                    error_code: Some(err.code()),
                    ..base.with_message(err.to_string())
                }
            }
            Assessed::Interrupted => interrupted(issue),
            Assessed::RemoteMissing(number) => IssueReport {
                outcome: SyncOutcome::Skipped,
                ..base.with_message(format!("GitHub issue #{number} not found"))
            },
            Assessed::Validated(_) => IssueReport {
                outcome: SyncOutcome::Validated,
                ..base
            },
            Assessed::Failed(err) => {
                warn!(issue = %issue.id, error = %err, "sync failed");
                if options.mutates() {
                    self.record(issue, SyncRecord::failure(err.to_string()), None);
                }
                IssueReport {
                    title: base.title,
                    github_issue: base.github_issue,
                    ..IssueReport::error(issue.id.clone(), &err)
                }
            }
            Assessed::Ready(assessment) => self.apply_plan(issue, *assessment, base, options),
        }
    }

    fn apply_plan(
        &self,
        issue: &Issue,
        assessment: Assessment,
        base: IssueReport,
        options: &SyncOptions,
    ) -> IssueReport {
        let Assessment {
            remote,
            classified,
            plan,
        } = assessment;
        let fields = classified.iter().cloned().collect();
        let mut report = base.with_plan(fields, &plan);
        let (local_changes, github_changes) = changed_sides(&classified);

        if plan.is_blocked() {
            report.outcome = SyncOutcome::ConflictBlocked;
            report.applied.clear();
            let names = plan.unresolved_fields().iter().map(SyncField::as_str).join(", ");
            report.message = Some(format!("unresolved conflicts: {names}"));
            if options.mutates() {
                let record = SyncRecord::failure(format!("unresolved conflicts: {names}"))
                    .with_changes(local_changes, github_changes);
                self.record(issue, record, None);
            }
            warn!(issue = %issue.id, fields = %names, "conflicts need resolution");
            return report;
        }

        if options.dry_run {
            report.outcome = if plan.has_changes() {
                SyncOutcome::Planned
            } else {
                SyncOutcome::NoChange
            };
            return report;
        }

        if plan.has_changes() && self.needs_confirmation(options) {
            let confirmed = self
                .confirm
                .as_ref()
                .is_none_or(|confirm| self.progress.suspend(|| confirm.confirm(issue, &plan)));
            if !confirmed {
                info!(issue = %issue.id, "sync declined");
                if options.mutates() {
                    let record = SyncRecord::failure("declined").with_changes(local_changes, github_changes);
                    self.record(issue, record, None);
                }
                report.outcome = SyncOutcome::Skipped;
                report.message = Some("declined".to_string());
                report.applied.clear();
                report.resolution = None;
                return report;
            }
        }

        if plan.has_changes() {
            match self.store.update(&issue.id, &plan.field_set()) {
                Ok(Some(_)) => {
                    report.outcome = SyncOutcome::Applied;
                    info!(issue = %issue.id, fields = ?plan.applied_fields(), "applied remote changes");
                }
                Ok(None) => {
                    report.outcome = SyncOutcome::Skipped;
                    report.message = Some("issue removed locally during sync".to_string());
                    report.applied.clear();
                    report.resolution = None;
                    return report;
                }
                Err(err) => {
                    warn!(issue = %issue.id, error = %err, "apply failed");
                    self.record(issue, SyncRecord::failure(err.to_string()), None);
                    let mut failed = IssueReport::error(issue.id.clone(), &err);
                    failed.github_issue = report.github_issue;
                    failed.title = report.title;
                    failed.fields = report.fields;
                    return failed;
                }
            }
        } else {
            report.outcome = SyncOutcome::NoChange;
        }

        let record = SyncRecord::success()
            .with_changes(local_changes, github_changes)
            .with_applied(plan.applied_fields())
            .with_resolution(plan.resolution.clone());
        if let Err(err) = self.try_record(issue, record, Some(remote)) {
            warn!(issue = %issue.id, error = %err, "failed to record sync metadata");
            report.outcome = SyncOutcome::Error;
            report.error_code = Some(err.code());
            report.message = Some(format!("recording sync metadata: {err}"));
        }
        report
    }

    fn needs_confirmation(&self, options: &SyncOptions) -> bool {
        self.policy.confirm_before_sync && !options.auto_confirm
    }

    fn try_record(&self, issue: &Issue, record: SyncRecord, baseline: Option<IssueSnapshot>) -> Result<()> {
        SyncMetadataService::new(self.store.as_ref(), self.history_limit)
            .record(&issue.id, record, baseline)
            .map(|_| ())
    }

    fn record(&self, issue: &Issue, record: SyncRecord, baseline: Option<IssueSnapshot>) {
        if let Err(err) = self.try_record(issue, record, baseline) {
            warn!(issue = %issue.id, error = %err, "failed to record sync attempt");
        }
    }
}

fn interrupted(issue: &Issue) -> IssueReport {
    let mut report =
        IssueReport::skipped(issue.id.clone(), "interrupted").with_issue(issue.github_issue, &issue.title);
    report.error_code = Some(RoadmapError::Interrupted(issue.id.clone()).code());
    report
}

/// Fields changed locally and on GitHub since the baseline.
fn changed_sides(classified: &ClassifiedDiff) -> (Vec<SyncField>, Vec<SyncField>) {
    let local = classified
        .iter()
        .filter(|f| matches!(f.verdict, ConflictVerdict::LocalOnly | ConflictVerdict::Conflict))
        .map(|f| f.field)
        .collect();
    let github = classified
        .iter()
        .filter(|f| matches!(f.verdict, ConflictVerdict::RemoteOnly | ConflictVerdict::Conflict))
        .map(|f| f.field)
        .collect();
    (local, github)
}
