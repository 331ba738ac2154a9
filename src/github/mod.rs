//! GitHub Issues integration.
//!
//! [`RemoteIssueClient`] is the seam the sync engine talks to. The real
//! implementation is [`GitHubClient`] (REST v3, blocking reqwest); tests use
//! [`MockRemoteClient`].

pub mod client;
pub mod mock;
pub mod types;

pub use client::{GH_API, GitHubClient, RemoteIssueClient, token_from_env};
pub use mock::{MockRemoteClient, RemoteFailure};
pub use types::{
    NewRemoteIssue, RemoteIssue, RemoteIssuePatch, RemoteLabel, RemoteUser, RepoRef, parse_repo,
};
