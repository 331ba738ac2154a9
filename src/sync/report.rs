//! Per-run sync report. Built by the orchestrator, never persisted.

use serde::Serialize;

use crate::cli::output::{HumanLayout, OutputFormat};
use crate::error::{ErrorCode, RoadmapError};

use super::classify::{ClassifiedField, ConflictVerdict};
use super::resolve::{ConflictResolution, ResolutionMode, ResolutionPlan};
use super::snapshot::SyncField;

/// Final state of one issue in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Remote changes were written locally.
    Applied,
    /// Nothing differed (or only local edits), nothing written.
    NoChange,
    /// Unresolved conflicts in manual mode.
    ConflictBlocked,
    /// Fetch or apply failed.
    Error,
    /// Not processed: unlinked, not found, interrupted, or declined.
    Skipped,
    /// Dry run: changes would be applied.
    Planned,
    /// Validate-only: remote issue exists.
    Validated,
}

impl SyncOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NoChange => "no-change",
            Self::ConflictBlocked => "conflict",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Planned => "planned",
            Self::Validated => "validated",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    pub issue_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_issue: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub outcome: SyncOutcome,
    /// Every differing field with its verdict.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ClassifiedField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<SyncField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kept_local: Vec<SyncField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<SyncField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConflictResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    /// The remote could not be asked (transport, timeout, auth, API error).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub remote_access_error: bool,
}

impl IssueReport {
    pub fn new(issue_id: impl Into<String>, outcome: SyncOutcome) -> Self {
        Self {
            issue_id: issue_id.into(),
            github_issue: None,
            title: None,
            outcome,
            fields: Vec::new(),
            applied: Vec::new(),
            kept_local: Vec::new(),
            unresolved: Vec::new(),
            resolution: None,
            message: None,
            error_code: None,
            remote_access_error: false,
        }
    }

    pub fn skipped(issue_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(issue_id, SyncOutcome::Skipped).with_message(reason)
    }

    pub fn error(issue_id: impl Into<String>, err: &RoadmapError) -> Self {
        let mut report = Self::new(issue_id, SyncOutcome::Error).with_message(err.to_string());
        report.error_code = Some(err.code());
        report.remote_access_error = err.is_remote_access();
        report
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_issue(mut self, github_issue: Option<u64>, title: &str) -> Self {
        self.github_issue = github_issue;
        self.title = Some(title.to_string());
        self
    }

    /// Copy the plan's field lists into the report.
    #[must_use]
    pub fn with_plan(mut self, fields: Vec<ClassifiedField>, plan: &ResolutionPlan) -> Self {
        self.fields = fields;
        self.applied = plan.applied_fields();
        self.kept_local = plan.kept_local.iter().map(|f| f.field).collect();
        self.unresolved = plan.unresolved_fields();
        self.resolution.clone_from(&plan.resolution);
        self
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub applied: usize,
    pub no_change: usize,
    pub conflicts: usize,
    pub errors: usize,
    pub skipped: usize,
    pub planned: usize,
    pub validated: usize,
    pub fields_applied: usize,
    pub conflicts_resolved: usize,
}

impl Summary {
    fn tally(reports: &[IssueReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report.outcome {
                SyncOutcome::Applied => summary.applied += 1,
                SyncOutcome::NoChange => summary.no_change += 1,
                SyncOutcome::ConflictBlocked => summary.conflicts += 1,
                SyncOutcome::Error => summary.errors += 1,
                SyncOutcome::Skipped => summary.skipped += 1,
                SyncOutcome::Planned => summary.planned += 1,
                SyncOutcome::Validated => summary.validated += 1,
            }
            if report.outcome == SyncOutcome::Applied {
                summary.fields_applied += report.applied.len();
            }
            summary.conflicts_resolved += report.resolution.as_ref().map_or(0, |r| r.fields.len());
        }
        summary
    }
}

/// Result of one `sync` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub per_issue: Vec<IssueReport>,
    pub summary: Summary,
    pub mode: ResolutionMode,
    pub dry_run: bool,
    pub validate_only: bool,
    pub interrupted: bool,
    pub duration_ms: u128,
}

impl SyncReport {
    #[must_use]
    pub fn new(
        per_issue: Vec<IssueReport>,
        mode: ResolutionMode,
        dry_run: bool,
        validate_only: bool,
    ) -> Self {
        let summary = Summary::tally(&per_issue);
        Self {
            per_issue,
            summary,
            mode,
            dry_run,
            validate_only,
            interrupted: false,
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.summary.conflicts > 0
    }

    /// True when the run wrote (or in dry-run would write) any field.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.summary.applied > 0 || self.summary.planned > 0
    }

    #[must_use]
    pub fn has_remote_access_errors(&self) -> bool {
        self.per_issue.iter().any(|r| r.remote_access_error)
    }

    #[must_use]
    pub fn get(&self, issue_id: &str) -> Option<&IssueReport> {
        self.per_issue.iter().find(|r| r.issue_id == issue_id)
    }

    /// Process exit code for this run.
    ///
    /// A dry run only fails when the remote could not be reached.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.dry_run || self.validate_only {
            return u8::from(self.has_remote_access_errors() || self.interrupted);
        }
        u8::from(self.has_conflicts() || self.summary.errors > 0 || self.interrupted)
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        let s = &self.summary;
        format!(
            "{} issue(s): {} applied, {} unchanged, {} conflict(s), {} error(s), {} skipped{}",
            s.total,
            s.applied + s.planned,
            s.no_change,
            s.conflicts,
            s.errors,
            s.skipped,
            if self.dry_run { " (dry run)" } else { "" }
        )
    }

    /// Human rendering; `verbose` adds per-field detail for every issue.
    #[must_use]
    pub fn render(&self, format: OutputFormat, verbose: bool) -> String {
        let mut layout = HumanLayout::for_format(format);
        let heading = match (self.validate_only, self.dry_run) {
            (true, _) => "Sync validation",
            (false, true) => "Sync plan (dry run)",
            (false, false) => "Sync report",
        };
        layout.title(heading);

        let s = &self.summary;
        layout
            .kv("Issues", &s.total.to_string())
            .kv("Mode", self.mode.as_str());
        if self.validate_only {
            layout.kv("Validated", &s.validated.to_string());
        } else if self.dry_run {
            layout.kv("Would apply", &s.planned.to_string());
        } else {
            layout
                .kv("Applied", &s.applied.to_string())
                .kv("Fields written", &s.fields_applied.to_string());
        }
        layout
            .kv("Unchanged", &s.no_change.to_string())
            .kv("Conflicts", &s.conflicts.to_string())
            .kv("Errors", &s.errors.to_string())
            .kv("Skipped", &s.skipped.to_string())
            .kv("Duration", &format!("{}ms", self.duration_ms));
        if s.conflicts_resolved > 0 {
            layout.kv("Resolved", &s.conflicts_resolved.to_string());
        }
        if self.interrupted {
            layout.blank().push_line("Interrupted: remaining issues were not processed.");
        }

        let notable: Vec<&IssueReport> = self
            .per_issue
            .iter()
            .filter(|r| verbose || matches!(r.outcome, SyncOutcome::ConflictBlocked | SyncOutcome::Error))
            .collect();
        if notable.is_empty() {
            return layout.build();
        }

        layout.blank().section(if verbose { "Issues" } else { "Needs attention" });
        for report in notable {
            layout.bullet(&issue_line(report));
            if verbose {
                for field in &report.fields {
                    layout.push_line(format!("    {}", field_line(field)));
                }
            } else {
                for field in report.fields.iter().filter(|f| f.verdict == ConflictVerdict::Conflict) {
                    layout.push_line(format!("    {}", field_line(field)));
                }
            }
        }
        if self.has_conflicts() && !self.dry_run {
            layout
                .blank()
                .push_line("Re-run with --force-local or --force-github to settle conflicts.");
        }
        layout.build()
    }
}

fn issue_line(report: &IssueReport) -> String {
    let mut line = format!("{} [{}]", report.issue_id, report.outcome);
    if let Some(number) = report.github_issue {
        line.push_str(&format!(" #{number}"));
    }
    if let Some(title) = &report.title {
        line.push_str(&format!(" {title}"));
    }
    if let Some(message) = &report.message {
        line.push_str(&format!(": {message}"));
    }
    line
}

fn field_line(field: &ClassifiedField) -> String {
    format!(
        "{:<9} {:<12} local={} github={}",
        field.field.as_str(),
        field.verdict.to_string(),
        field.local,
        field.remote
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::snapshot::FieldValue;

    fn conflict_report() -> IssueReport {
        let field = ClassifiedField {
            field: SyncField::Title,
            local: FieldValue::Text("B".into()),
            remote: FieldValue::Text("C".into()),
            verdict: ConflictVerdict::Conflict,
        };
        let mut report = IssueReport::new("i1", SyncOutcome::ConflictBlocked);
        report.fields = vec![field];
        report.unresolved = vec![SyncField::Title];
        report
    }

    #[test]
    fn summary_counts_outcomes() {
        let report = SyncReport::new(
            vec![
                conflict_report(),
                IssueReport::new("i2", SyncOutcome::Applied),
                IssueReport::skipped("i3", "not linked"),
            ],
            ResolutionMode::Manual,
            false,
            false,
        );
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.conflicts, 1);
        assert!(report.has_conflicts());
        assert!(report.has_changes());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn dry_run_conflicts_exit_zero() {
        let report = SyncReport::new(vec![conflict_report()], ResolutionMode::Manual, true, false);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn remote_access_errors_fail_dry_runs() {
        let err = RoadmapError::Timeout("30s".into());
        let report = SyncReport::new(vec![IssueReport::error("i1", &err)], ResolutionMode::Manual, true, false);
        assert!(report.has_remote_access_errors());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn brief_render_lists_conflicts_only() {
        let report = SyncReport::new(
            vec![conflict_report(), IssueReport::new("i2", SyncOutcome::NoChange)],
            ResolutionMode::Manual,
            false,
            false,
        );
        let brief = report.render(OutputFormat::Plain, false);
        assert!(brief.contains("i1 [conflict]"));
        assert!(!brief.contains("i2"));
        let verbose = report.render(OutputFormat::Plain, true);
        assert!(verbose.contains("i2 [no-change]"));
    }

    #[test]
    fn report_serializes_outcomes_snake_case() {
        let report = SyncReport::new(vec![conflict_report()], ResolutionMode::Manual, false, false);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["per_issue"][0]["outcome"], "conflict_blocked");
        assert_eq!(json["summary"]["conflicts"], 1);
    }
}
