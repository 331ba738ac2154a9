//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints that
//! name the issue or config key involved.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::IssueNotFound => suggest_issue_not_found(context),
        ErrorCode::IssueNotLinked => suggest_issue_not_linked(context),
        ErrorCode::ConfigMissingRequired => suggest_config_missing_required(context),
        ErrorCode::RemoteApiError => suggest_remote_api(context),
        _ => code.suggestion().to_string(),
    }
}

fn context_str<'a>(context: Option<&'a Value>, key: &str) -> Option<&'a str> {
    context.and_then(|c| c.get(key)).and_then(Value::as_str)
}

fn suggest_issue_not_found(context: Option<&Value>) -> String {
    match context_str(context, "issue_id") {
        Some(id) => format!(
            "Issue '{id}' not found. Check `<root>/issues/{id}.yaml` exists, or sync with `--all`"
        ),
        None => ErrorCode::IssueNotFound.suggestion().to_string(),
    }
}

fn suggest_issue_not_linked(context: Option<&Value>) -> String {
    match context_str(context, "issue_id") {
        Some(id) => format!(
            "Link it with `roadmap link {id} --number <n>` or create the remote issue with `roadmap link {id} --create`"
        ),
        None => ErrorCode::IssueNotLinked.suggestion().to_string(),
    }
}

fn suggest_config_missing_required(context: Option<&Value>) -> String {
    match context_str(context, "config_key") {
        Some("github.repo") => {
            "Set `repo = \"owner/name\"` under [github] in config.toml, or export ROADMAP_GITHUB_REPO"
                .to_string()
        }
        Some(key) => format!("Add `{key}` to config.toml"),
        None => ErrorCode::ConfigMissingRequired.suggestion().to_string(),
    }
}

fn suggest_remote_api(context: Option<&Value>) -> String {
    let status = context
        .and_then(|c| c.get("status"))
        .and_then(Value::as_u64);
    match status {
        Some(403) => "GitHub refused the request; the token may lack the `repo` scope or be rate limited"
            .to_string(),
        Some(410) => "Issues are disabled for this repository".to_string(),
        Some(s) if s >= 500 => "GitHub is having trouble; retry in a few minutes".to_string(),
        _ => ErrorCode::RemoteApiError.suggestion().to_string(),
    }
}
