use clap::Args;
use itertools::Itertools;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, RoadmapError};
use crate::issues::{Issue, IssueFilter, IssueStore};
use crate::sync::{LockHolder, SyncField, SyncLock, SyncMetadataService, SyncRecord, SyncStatistics};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Show one issue's sync metadata
    #[arg(value_name = "ISSUE_ID")]
    pub issue_id: Option<String>,

    /// Include the sync history (with ISSUE_ID)
    #[arg(long, requires = "issue_id")]
    pub history: bool,
}

#[derive(Debug, Serialize)]
struct OverviewPayload<'a> {
    repo: Option<String>,
    statistics: &'a SyncStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock: Option<LockHolder>,
}

pub fn run(ctx: &AppContext, args: &StatusArgs) -> Result<()> {
    match &args.issue_id {
        Some(id) => issue_status(ctx, id, args.history),
        None => overview(ctx),
    }
}

fn overview(ctx: &AppContext) -> Result<()> {
    let issues = ctx.store.list(&IssueFilter::all())?;
    let stats = SyncMetadataService::get_statistics(&issues);
    let lock = SyncLock::status(&ctx.root)?;
    let repo = ctx.repo()?.map(|r| r.to_string());

    if ctx.is_json() {
        return emit_json(&OverviewPayload {
            repo,
            statistics: &stats,
            lock,
        });
    }

    let mut layout = HumanLayout::for_format(ctx.output_format);
    layout
        .title("Sync status")
        .kv("Repository", repo.as_deref().unwrap_or("(not configured)"))
        .kv("Issues", &stats.issues.to_string())
        .kv("Linked", &stats.linked_issues.to_string())
        .kv("Never synced", &stats.never_synced.to_string())
        .kv("Total syncs", &stats.total_syncs.to_string())
        .kv("Successful", &stats.successful_syncs.to_string())
        .kv("Failed", &stats.failed_syncs.to_string())
        .kv("Success rate", &format!("{:.1}%", stats.success_rate))
        .kv("Conflicts resolved", &stats.conflicts_resolved.to_string())
        .kv("Conflict rate", &format!("{:.1}%", stats.conflict_rate))
        .kv(
            "Last sync",
            &stats
                .last_sync_time
                .map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
        );
    if let Some(holder) = lock {
        layout.kv(
            "Lock",
            &format!("held by pid {} on {} since {}", holder.pid, holder.hostname, holder.acquired_at),
        );
    }
    emit_human(layout);
    Ok(())
}

fn issue_status(ctx: &AppContext, id: &str, history: bool) -> Result<()> {
    let issue = ctx
        .store
        .get(id)?
        .ok_or_else(|| RoadmapError::IssueNotFound(id.to_string()))?;

    if ctx.is_json() {
        let mut meta = serde_json::to_value(&issue.sync)?;
        if !history && let Some(obj) = meta.as_object_mut() {
            obj.remove("sync_history");
        }
        let payload = serde_json::json!({
            "issue_id": issue.id,
            "title": issue.title,
            "github_issue": issue.github_issue,
            "failed_syncs": issue.sync.failed_syncs(),
            "success_rate": issue.sync.success_rate(),
            "sync": meta,
        });
        return emit_json(&payload);
    }

    emit_human(issue_layout(ctx, &issue, history));
    Ok(())
}

fn issue_layout(ctx: &AppContext, issue: &Issue, history: bool) -> HumanLayout {
    let meta = &issue.sync;
    let mut layout = HumanLayout::for_format(ctx.output_format);
    layout
        .title(&format!("{} {}", issue.id, issue.title))
        .kv(
            "GitHub issue",
            &issue
                .github_issue
                .map_or_else(|| "not linked".to_string(), |n| format!("#{n}")),
        )
        .kv("Syncs", &meta.sync_count.to_string())
        .kv("Successful", &meta.successful_syncs.to_string())
        .kv("Failed", &meta.failed_syncs().to_string())
        .kv("Success rate", &format!("{:.1}%", meta.success_rate()))
        .kv("Conflicts resolved", &meta.conflicts_resolved.to_string())
        .kv(
            "Last status",
            &meta
                .last_sync_status
                .map_or_else(|| "never synced".to_string(), |s| s.to_string()),
        )
        .kv("Baseline", if meta.baseline.is_some() { "stored" } else { "none" });

    if history && !meta.sync_history.is_empty() {
        layout.blank().section("History");
        for record in meta.sync_history.iter().rev() {
            layout.bullet(&record_line(record));
        }
    }
    layout
}

fn record_line(record: &SyncRecord) -> String {
    let mut line = format!(
        "{} {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        if record.success { "ok" } else { "failed" }
    );
    if !record.applied.is_empty() {
        line.push_str(&format!(" applied: {}", record.applied.iter().map(SyncField::as_str).join(", ")));
    }
    if let Some(resolution) = &record.conflict_resolution {
        line.push_str(&format!(" resolved: {resolution}"));
    }
    if let Some(message) = &record.error_message {
        line.push_str(&format!(" ({message})"));
    }
    line
}
