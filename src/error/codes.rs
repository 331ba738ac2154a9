//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Issue errors
//! - 3xx: Config errors
//! - 5xx: Network errors
//! - 6xx: Storage errors
//! - 7xx: Sync errors
//! - 8xx: Validation and lock errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `IssueNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Issue errors (1xx)
    // ========================================
    /// E101: Requested issue was not found in the local store
    IssueNotFound,
    /// E102: Issue record is malformed or fails schema validation
    IssueInvalid,
    /// E103: Issue has no GitHub issue number recorded
    IssueNotLinked,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file or flags are invalid
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Network errors (5xx)
    // ========================================
    /// E501: Cannot reach GitHub
    NetworkUnreachable,
    /// E502: Request to GitHub timed out
    NetworkTimeout,
    /// E503: GitHub rejected the credentials
    NetworkAuthFailed,
    /// E504: GitHub answered with an unexpected status
    RemoteApiError,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E605: Serialization/deserialization failed
    SerializationError,
    /// E606: IO operation failed
    IoError,

    // ========================================
    // Sync errors (7xx)
    // ========================================
    /// E701: Sync run was interrupted
    SyncInterrupted,

    // ========================================
    // Validation and lock errors (8xx)
    // ========================================
    /// E801: Validation rules failed
    ValidationFailed,
    /// E851: Failed to acquire the sync lock within timeout
    LockTimeout,
    /// E852: Failed to acquire the sync lock
    LockFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E905: Generic not found (catch-all)
    NotFound,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `IssueNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::IssueNotFound => 101,
            Self::IssueInvalid => 102,
            Self::IssueNotLinked => 103,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::NetworkUnreachable => 501,
            Self::NetworkTimeout => 502,
            Self::NetworkAuthFailed => 503,
            Self::RemoteApiError => 504,

            Self::SerializationError => 605,
            Self::IoError => 606,

            Self::SyncInterrupted => 701,

            Self::ValidationFailed => 801,
            Self::LockTimeout => 851,
            Self::LockFailed => 852,

            Self::NotFound => 905,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::IssueNotFound => "Check the issue ID. Issue files live under <root>/issues/",
            Self::IssueInvalid => "Fix the issue file by hand; every issue needs a non-empty title",
            Self::IssueNotLinked => "Link the issue first with `roadmap link <id> --number <n>`",
            Self::ConfigInvalid => "Check TOML syntax in config.toml and the flags passed on the command line",
            Self::ConfigMissingRequired => "Add the missing key to config.toml or set the matching ROADMAP_* variable",
            Self::NetworkUnreachable => "Check your network connection and the configured github.api_url",
            Self::NetworkTimeout => "GitHub did not answer in time. Retry, or raise github.timeout in config",
            Self::NetworkAuthFailed => "Verify the token in GITHUB_TOKEN (or the env var named by github.token_env)",
            Self::RemoteApiError => "GitHub returned an unexpected status. Retry later or check the repository settings",
            Self::SerializationError => "The data format may be corrupted. Check the issue file for validity",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",
            Self::SyncInterrupted => "The run was interrupted. Re-run `roadmap sync` to process the remaining issues",
            Self::ValidationFailed => "Review the validation errors and fix each one",
            Self::LockTimeout => "Another sync may be running. Wait and retry, or check for a stale sync.lock",
            Self::LockFailed => "Failed to acquire the sync lock. Check permissions on the roadmap directory",
            Self::NotFound => "The requested resource was not found. Check the path or identifier",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SerializationError)
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "issue",
            3 => "config",
            5 => "network",
            6 => "storage",
            7 => "sync",
            8 => "validation",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::IssueNotFound,
            Self::IssueInvalid,
            Self::IssueNotLinked,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::NetworkUnreachable,
            Self::NetworkTimeout,
            Self::NetworkAuthFailed,
            Self::RemoteApiError,
            Self::SerializationError,
            Self::IoError,
            Self::SyncInterrupted,
            Self::ValidationFailed,
            Self::LockTimeout,
            Self::LockFailed,
            Self::NotFound,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
