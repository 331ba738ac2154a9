use clap::{ArgGroup, Args};
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_json};
use crate::error::{Result, RoadmapError};
use crate::github::{NewRemoteIssue, RemoteIssueClient, RemoteIssuePatch, RepoRef};
use crate::issues::{Issue, IssueStore};
use crate::sync::IssueState;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["number", "create"])))]
pub struct LinkArgs {
    /// Local issue to link
    #[arg(value_name = "ISSUE_ID")]
    pub issue_id: String,

    /// Existing GitHub issue number
    #[arg(long, value_name = "N")]
    pub number: Option<u64>,

    /// Create the GitHub issue from the local one
    #[arg(long)]
    pub create: bool,
}

#[derive(Debug, Serialize)]
struct LinkPayload {
    issue_id: String,
    github_issue: u64,
    repo: String,
    created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

pub fn run(ctx: &AppContext, args: &LinkArgs) -> Result<()> {
    let repo = ctx.require_repo()?;
    let client = ctx.remote_client()?;
    let payload = link_issue(ctx.store.as_ref(), client.as_ref(), &repo, args)?;

    if ctx.is_json() {
        return emit_json(&payload);
    }
    let mut layout = HumanLayout::for_format(ctx.output_format);
    layout
        .title(if payload.created { "Created and linked" } else { "Linked" })
        .kv("Issue", &payload.issue_id)
        .kv("GitHub issue", &format!("{}#{}", payload.repo, payload.github_issue));
    if let Some(url) = &payload.url {
        layout.kv("URL", url);
    }
    emit_human(layout);
    Ok(())
}

fn link_issue(
    store: &dyn IssueStore,
    client: &dyn RemoteIssueClient,
    repo: &RepoRef,
    args: &LinkArgs,
) -> Result<LinkPayload> {
    let issue = store
        .get(&args.issue_id)?
        .ok_or_else(|| RoadmapError::IssueNotFound(args.issue_id.clone()))?;

    let (number, url) = match args.number {
        Some(number) => {
            let remote = client
                .fetch(repo, number)?
                .ok_or_else(|| RoadmapError::NotFound(format!("GitHub issue {repo}#{number}")))?;
            (number, remote.html_url)
        }
        None => {
            if let Some(existing) = issue.github_issue {
                return Err(RoadmapError::ValidationFailed(format!(
                    "{} is already linked to #{existing}",
                    issue.id
                )));
            }
            create_remote(client, repo, &issue)?
        }
    };

    store
        .link(&issue.id, number)?
        .ok_or_else(|| RoadmapError::IssueNotFound(issue.id.clone()))?;
    info!(issue = %issue.id, %repo, number, "linked issue");

    Ok(LinkPayload {
        issue_id: issue.id,
        github_issue: number,
        repo: repo.to_string(),
        created: args.number.is_none(),
        url: Some(url).filter(|u| !u.is_empty()),
    })
}

/// GitHub creates issues open; closed local issues are closed right after.
fn create_remote(client: &dyn RemoteIssueClient, repo: &RepoRef, issue: &Issue) -> Result<(u64, String)> {
    let new_issue = NewRemoteIssue {
        title: issue.title.clone(),
        body: issue.body.clone(),
        assignees: issue.assignee.iter().cloned().collect(),
        labels: issue.labels.clone(),
    };
    let created = client.create(repo, &new_issue)?;
    if issue.status.is_closed() {
        let patch = RemoteIssuePatch {
            state: Some(IssueState::Closed),
            ..RemoteIssuePatch::default()
        };
        client.update(repo, created.number, &patch)?;
    }
    Ok((created.number, created.html_url))
}
