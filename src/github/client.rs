//! GitHub REST client for the issues resource.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::error::{Result, RoadmapError};

use super::types::{NewRemoteIssue, RemoteIssue, RemoteIssuePatch, RepoRef};

pub const GH_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("roadmap/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// Remote issue tracker operations used by sync and `link`.
///
/// A missing issue is `Ok(None)` / `Ok(false)`. Failing to reach the
/// tracker is always an error, never a `None`.
pub trait RemoteIssueClient: Send + Sync {
    fn fetch(&self, repo: &RepoRef, number: u64) -> Result<Option<RemoteIssue>>;

    fn exists(&self, repo: &RepoRef, number: u64) -> Result<bool> {
        Ok(self.fetch(repo, number)?.is_some())
    }

    fn create(&self, repo: &RepoRef, issue: &NewRemoteIssue) -> Result<RemoteIssue>;

    fn update(&self, repo: &RepoRef, number: u64, patch: &RemoteIssuePatch)
    -> Result<RemoteIssue>;
}

/// Resolve a token: the configured variable first, then the usual fallbacks.
pub fn token_from_env(var: Option<&str>) -> Option<String> {
    var.into_iter()
        .chain(["GITHUB_TOKEN", "GH_TOKEN"])
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Blocking GitHub client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::blocking::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RoadmapError::Config(format!("build http client: {err}")))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build a client from the `[github]` config section.
    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let token = token_from_env(Some(config.token_env.as_str()));
        Self::new(config.api_url.clone(), token, config.timeout)
    }

    fn issue_url(&self, repo: &RepoRef, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/{number}",
            self.api_url, repo.owner, repo.name
        )
    }

    fn issues_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, repo.owner, repo.name)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::blocking::RequestBuilder {
        let mut request = self.client.request(method, url).header("Accept", ACCEPT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder, url: &str) -> Result<reqwest::blocking::Response> {
        debug!(url, "github request");
        request.send().map_err(|err| map_transport_error(&err, url))
    }

    fn send_json<T: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: &str,
        payload: &T,
    ) -> Result<RemoteIssue> {
        let response = self.send(self.request(method, url).json(payload), url)?;
        parse_json_response(response, url)
    }
}

impl RemoteIssueClient for GitHubClient {
    fn fetch(&self, repo: &RepoRef, number: u64) -> Result<Option<RemoteIssue>> {
        let url = self.issue_url(repo, number);
        let response = self.send(self.request(reqwest::Method::GET, &url), &url)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        parse_json_response(response, &url).map(Some)
    }

    fn create(&self, repo: &RepoRef, issue: &NewRemoteIssue) -> Result<RemoteIssue> {
        self.send_json(reqwest::Method::POST, &self.issues_url(repo), issue)
    }

    fn update(
        &self,
        repo: &RepoRef,
        number: u64,
        patch: &RemoteIssuePatch,
    ) -> Result<RemoteIssue> {
        let url = self.issue_url(repo, number);
        self.send_json(reqwest::Method::PATCH, &url, patch)
    }
}

fn map_transport_error(err: &reqwest::Error, url: &str) -> RoadmapError {
    if err.is_timeout() {
        RoadmapError::Timeout(format!("{url}: {err}"))
    } else {
        RoadmapError::Transport(format!("{url}: {err}"))
    }
}

fn parse_json_response<T: DeserializeOwned>(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<T> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(RoadmapError::AuthFailed(format!("{url}: HTTP {}", status.as_u16())));
    }
    if !status.is_success() {
        let message = response
            .json::<serde_json::Value>()
            .ok()
            .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        return Err(RoadmapError::RemoteApi {
            status: status.as_u16(),
            message,
        });
    }
    response.json::<T>().map_err(|err| {
        if err.is_timeout() {
            RoadmapError::Timeout(format!("{url}: {err}"))
        } else {
            RoadmapError::Serialization(format!("parse response from {url}: {err}"))
        }
    })
}
