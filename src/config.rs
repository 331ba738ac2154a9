use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadmapError};
use crate::github::{GH_API, RepoRef, parse_repo};
use crate::sync::engine::{DEFAULT_BATCH_SIZE, DEFAULT_WORKERS};
use crate::sync::metadata::DEFAULT_HISTORY_LIMIT;
use crate::sync::resolve::ResolutionMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub auto_sync: AutoSyncPolicy,
}

impl Config {
    /// Defaults, then global and project files (or only `explicit_path`),
    /// then `ROADMAP_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        Self::load_with(explicit_path, root, |key| std::env::var(key).ok())
    }

    fn load_with(
        explicit_path: Option<&Path>,
        root: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("ROADMAP_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(RoadmapError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&root.join("config.toml"))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides(&env)?;
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("roadmap/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| RoadmapError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| RoadmapError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.github {
            self.github.merge(patch);
        }
        if let Some(patch) = patch.sync {
            self.sync.merge(patch);
        }
        if let Some(patch) = patch.auto_sync {
            self.auto_sync.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env("ROADMAP_GITHUB_REPO") {
            self.github.repo = Some(value);
        }
        if let Some(value) = env("ROADMAP_GITHUB_API_URL") {
            self.github.api_url = value;
        }
        if let Some(value) = env("ROADMAP_GITHUB_TOKEN_ENV") {
            self.github.token_env = value;
        }
        if let Some(value) = env_duration(env, "ROADMAP_GITHUB_TIMEOUT")? {
            self.github.timeout = value;
        }

        if let Some(value) = env_usize(env, "ROADMAP_SYNC_WORKERS")? {
            self.sync.workers = value;
        }
        if let Some(value) = env_usize(env, "ROADMAP_SYNC_BATCH_SIZE")? {
            self.sync.batch_size = value;
        }
        if let Some(value) = env_usize(env, "ROADMAP_SYNC_HISTORY_LIMIT")? {
            self.sync.history_limit = value;
        }
        if let Some(value) = env_duration(env, "ROADMAP_SYNC_LOCK_TIMEOUT")? {
            self.sync.lock_timeout = value;
        }

        if let Some(value) = env_bool(env, "ROADMAP_AUTO_SYNC") {
            self.auto_sync.auto_sync_enabled = value;
        }
        if let Some(value) = env_bool(env, "ROADMAP_CONFIRM_BEFORE_SYNC") {
            self.auto_sync.confirm_before_sync = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.sync.workers == 0 {
            return Err(RoadmapError::Config("sync.workers must be at least 1".to_string()));
        }
        if self.sync.batch_size == 0 {
            return Err(RoadmapError::Config("sync.batch_size must be at least 1".to_string()));
        }
        if self.sync.history_limit == 0 {
            return Err(RoadmapError::Config("sync.history_limit must be at least 1".to_string()));
        }
        if self.auto_sync.force_local && self.auto_sync.force_github {
            return Err(RoadmapError::Config(
                "auto_sync.force_local and auto_sync.force_github cannot both be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// `owner/name` of the tracked repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub api_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            api_url: GH_API.to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GitHubConfig {
    fn merge(&mut self, patch: GitHubPatch) {
        if let Some(value) = patch.repo {
            self.repo = Some(value);
        }
        if let Some(value) = patch.api_url {
            self.api_url = value;
        }
        if let Some(value) = patch.token_env {
            self.token_env = value;
        }
        if let Some(value) = patch.timeout {
            self.timeout = value;
        }
    }

    /// Parsed repository, `None` when not configured.
    pub fn repo_ref(&self) -> Result<Option<RepoRef>> {
        self.repo
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(parse_repo)
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub workers: usize,
    pub batch_size: usize,
    /// Records kept in each issue's rolling sync history.
    pub history_limit: usize,
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            lock_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncSettings {
    fn merge(&mut self, patch: SyncPatch) {
        if let Some(value) = patch.workers {
            self.workers = value;
        }
        if let Some(value) = patch.batch_size {
            self.batch_size = value;
        }
        if let Some(value) = patch.history_limit {
            self.history_limit = value;
        }
        if let Some(value) = patch.lock_timeout {
            self.lock_timeout = value;
        }
    }
}

/// Git event a hook invocation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookEvent {
    Commit,
    Checkout,
    Merge,
}

/// When and how automatic syncs run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSyncPolicy {
    pub auto_sync_enabled: bool,
    pub sync_on_commit: bool,
    pub sync_on_checkout: bool,
    pub sync_on_merge: bool,
    pub confirm_before_sync: bool,
    pub force_local: bool,
    pub force_github: bool,
}

impl AutoSyncPolicy {
    fn merge(&mut self, patch: AutoSyncPatch) {
        if let Some(value) = patch.auto_sync_enabled {
            self.auto_sync_enabled = value;
        }
        if let Some(value) = patch.sync_on_commit {
            self.sync_on_commit = value;
        }
        if let Some(value) = patch.sync_on_checkout {
            self.sync_on_checkout = value;
        }
        if let Some(value) = patch.sync_on_merge {
            self.sync_on_merge = value;
        }
        if let Some(value) = patch.confirm_before_sync {
            self.confirm_before_sync = value;
        }
        if let Some(value) = patch.force_local {
            self.force_local = value;
        }
        if let Some(value) = patch.force_github {
            self.force_github = value;
        }
    }

    /// Default conflict mode when no force flag is given on the command line.
    pub fn resolution_mode(&self) -> Result<ResolutionMode> {
        ResolutionMode::from_flags(self.force_local, self.force_github)
    }

    /// Whether a hook for `event` should run a sync.
    #[must_use]
    pub const fn should_trigger(&self, event: HookEvent) -> bool {
        self.auto_sync_enabled
            && match event {
                HookEvent::Commit => self.sync_on_commit,
                HookEvent::Checkout => self.sync_on_checkout,
                HookEvent::Merge => self.sync_on_merge,
            }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub github: Option<GitHubPatch>,
    pub sync: Option<SyncPatch>,
    pub auto_sync: Option<AutoSyncPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GitHubPatch {
    pub repo: Option<String>,
    pub api_url: Option<String>,
    pub token_env: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SyncPatch {
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub history_limit: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    pub lock_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AutoSyncPatch {
    pub auto_sync_enabled: Option<bool>,
    pub sync_on_commit: Option<bool>,
    pub sync_on_checkout: Option<bool>,
    pub sync_on_merge: Option<bool>,
    pub confirm_before_sync: Option<bool>,
    pub force_local: Option<bool>,
    pub force_github: Option<bool>,
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_usize(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    match env(key) {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|err| RoadmapError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}

fn env_duration(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    match env(key) {
        Some(value) => humantime_serde::re::humantime::parse_duration(value.trim())
            .map(Some)
            .map_err(|err| RoadmapError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}
