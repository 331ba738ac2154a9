use std::sync::Arc;

use clap::Args;
use console::Term;
use itertools::Itertools;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::emit_json;
use crate::cli::progress::{ProgressMode, sync_bar};
use crate::config::HookEvent;
use crate::error::Result;
use crate::issues::{Issue, IssueStatus};
use crate::sync::{CancelToken, ResolutionPlan, Selection, SyncField, SyncOptions, SyncOrchestrator};

#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Sync only this issue
    #[arg(value_name = "ISSUE_ID", conflicts_with_all = ["all", "milestone", "status"])]
    pub issue_id: Option<String>,

    /// Sync every linked issue (default when no selector is given)
    #[arg(long, conflicts_with_all = ["milestone", "status"])]
    pub all: bool,

    /// Sync issues in a milestone
    #[arg(long, value_name = "NAME", conflicts_with = "status")]
    pub milestone: Option<String>,

    /// Sync issues with a status (todo, in-progress, blocked, review, closed)
    #[arg(long, value_name = "STATUS")]
    pub status: Option<IssueStatus>,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// List every issue and field in the report
    #[arg(long)]
    pub verbose_report: bool,

    /// Settle conflicts by keeping local values
    #[arg(long)]
    pub force_local: bool,

    /// Settle conflicts by taking GitHub values
    #[arg(long)]
    pub force_github: bool,

    /// Only check that linked GitHub issues exist
    #[arg(long)]
    pub validate_only: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y')]
    pub auto_confirm: bool,

    /// Concurrent remote fetches (default from config)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Issues per batch (default from config)
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Invoked from a git hook; runs only if the policy enables this event
    #[arg(long, value_enum, value_name = "EVENT")]
    pub hook: Option<HookEvent>,
}

impl SyncArgs {
    #[must_use]
    pub fn selection(&self) -> Selection {
        if let Some(id) = &self.issue_id {
            Selection::Single(id.clone())
        } else if let Some(milestone) = &self.milestone {
            Selection::Milestone(milestone.clone())
        } else if let Some(status) = self.status {
            Selection::Status(status)
        } else {
            Selection::AllLinked
        }
    }

    #[must_use]
    pub fn options(&self, ctx: &AppContext) -> SyncOptions {
        SyncOptions {
            dry_run: self.dry_run,
            verbose: self.verbose_report,
            force_local: self.force_local,
            force_github: self.force_github,
            validate_only: self.validate_only,
            auto_confirm: self.auto_confirm,
            workers: self.workers.unwrap_or(ctx.config.sync.workers),
            batch_size: self.batch_size.unwrap_or(ctx.config.sync.batch_size),
        }
    }
}

pub fn run(ctx: &AppContext, args: &SyncArgs) -> Result<u8> {
    if let Some(event) = args.hook
        && !ctx.config.auto_sync.should_trigger(event)
    {
        info!(?event, "auto-sync disabled for this hook, nothing to do");
        return Ok(0);
    }

    let options = args.options(ctx);
    let cancel = CancelToken::new();
    cancel.install_ctrlc_handler()?;

    let orchestrator = SyncOrchestrator::new(ctx.store.clone(), ctx.remote_client()?, ctx.repo()?)
        .with_policy(ctx.config.auto_sync.clone())
        .with_history_limit(ctx.config.sync.history_limit)
        .with_lock(ctx.root.clone(), ctx.config.sync.lock_timeout)
        .with_cancel_token(cancel)
        .with_confirm(Arc::new(prompt_confirm))
        .with_progress(sync_bar(ProgressMode::detect(ctx.output_format, ctx.quiet)));

    let report = orchestrator.run(&args.selection(), &options)?;

    if ctx.is_json() {
        emit_json(&report)?;
    } else {
        println!("{}", report.render(ctx.output_format, options.verbose));
    }
    Ok(report.exit_code())
}

/// Ask on the terminal; anything but yes declines, as does a missing terminal.
fn prompt_confirm(issue: &Issue, plan: &ResolutionPlan) -> bool {
    let term = Term::stderr();
    if !term.is_term() {
        return false;
    }
    let fields = plan.applied_fields().iter().map(SyncField::as_str).join(", ");
    let question = format!("Apply GitHub {fields} to {} ({})? [y/N] ", issue.id, issue.title);
    if term.write_str(&question).is_err() {
        return false;
    }
    term.read_line()
        .is_ok_and(|answer| matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
