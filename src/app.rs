//! Per-invocation context shared by command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::{Result, RoadmapError};
use crate::github::{GitHubClient, RemoteIssueClient, RepoRef};
use crate::issues::FileIssueStore;

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub store: Arc<FileIssueStore>,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = cli.root.clone();
        let config = Config::load(cli.config.as_deref(), &root)?;
        let store = Arc::new(FileIssueStore::open(&root)?);
        debug!(root = %root.display(), "opened issue store");
        Ok(Self {
            root,
            config,
            store,
            output_format: cli.output_format(),
            quiet: cli.quiet,
        })
    }

    /// Configured repository; `None` is left for the caller to report.
    pub fn repo(&self) -> Result<Option<RepoRef>> {
        self.config.github.repo_ref()
    }

    pub fn require_repo(&self) -> Result<RepoRef> {
        self.repo()?
            .ok_or_else(|| RoadmapError::MissingConfig("github.repo".to_string()))
    }

    pub fn remote_client(&self) -> Result<Arc<dyn RemoteIssueClient>> {
        Ok(Arc::new(GitHubClient::from_config(&self.config.github)?))
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.output_format.is_machine_readable()
    }
}
