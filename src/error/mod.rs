//! Error handling for roadmap.
//!
//! This module provides:
//! - [`RoadmapError`]: The main error enum for all roadmap operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context
//! - Suggestion helpers for context-aware error recovery hints

mod codes;
mod suggestions;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;
pub use suggestions::suggest_for_error;

/// Main error type for roadmap operations.
#[derive(Error, Debug)]
pub enum RoadmapError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Issue not found: {0}")]
    IssueNotFound(String),

    #[error("Invalid issue: {0}")]
    InvalidIssue(String),

    #[error("Issue {0} is not linked to a GitHub issue")]
    NotLinked(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Remote unreachable: {0}")]
    Transport(String),

    #[error("Remote request timed out: {0}")]
    Timeout(String),

    #[error("GitHub authentication failed: {0}")]
    AuthFailed(String),

    #[error("GitHub API error (HTTP {status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    #[error("Lock failed: {0}")]
    LockFailed(String),

    #[error("Interrupted: {0}")]
    Interrupted(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl RoadmapError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Yaml(_) | Self::Serialization(_) => ErrorCode::SerializationError,
            Self::IssueNotFound(_) => ErrorCode::IssueNotFound,
            Self::InvalidIssue(_) => ErrorCode::IssueInvalid,
            Self::NotLinked(_) => ErrorCode::IssueNotLinked,
            Self::ValidationFailed(_) => ErrorCode::ValidationFailed,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::Transport(_) => ErrorCode::NetworkUnreachable,
            Self::Timeout(_) => ErrorCode::NetworkTimeout,
            Self::AuthFailed(_) => ErrorCode::NetworkAuthFailed,
            Self::RemoteApi { .. } => ErrorCode::RemoteApiError,
            Self::LockTimeout(_) => ErrorCode::LockTimeout,
            Self::LockFailed(_) => ErrorCode::LockFailed,
            Self::Interrupted(_) => ErrorCode::SyncInterrupted,
            Self::NotFound(_) => ErrorCode::NotFound,
        }
    }

    /// True when the remote tracker could not be asked at all.
    ///
    /// A `None` from the remote client means "not found"; these variants
    /// mean the question never got an answer.
    #[must_use]
    pub const fn is_remote_access(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::AuthFailed(_) | Self::RemoteApi { .. }
        )
    }

    /// True for errors that must abort a run before any remote call.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingConfig(_))
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::IssueNotFound(id) | Self::NotLinked(id) => {
                Some(serde_json::json!({ "issue_id": id }))
            }
            Self::InvalidIssue(reason) => Some(serde_json::json!({ "reason": reason })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            Self::RemoteApi { status, message } => {
                Some(serde_json::json!({ "status": status, "message": message }))
            }
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Emitted on stdout in JSON output mode so scripts and git hooks can act on
/// failures without parsing prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "ISSUE_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "issue", "config", "network")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a [`RoadmapError`].
    #[must_use]
    pub fn from_error(err: &RoadmapError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.suggestion = suggest_for_error(self.code, self.context.as_ref());
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&RoadmapError> for StructuredError {
    fn from(err: &RoadmapError) -> Self {
        Self::from_error(err)
    }
}

/// Result type alias using [`RoadmapError`].
pub type Result<T> = std::result::Result<T, RoadmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            RoadmapError::IssueNotFound("abc".into()).code(),
            ErrorCode::IssueNotFound
        );
        assert_eq!(
            RoadmapError::Config("bad".into()).code(),
            ErrorCode::ConfigInvalid
        );
        assert_eq!(
            RoadmapError::RemoteApi {
                status: 502,
                message: "bad gateway".into()
            }
            .code(),
            ErrorCode::RemoteApiError
        );
    }

    #[test]
    fn test_remote_access_classification() {
        assert!(RoadmapError::Transport("refused".into()).is_remote_access());
        assert!(RoadmapError::Timeout("30s".into()).is_remote_access());
        assert!(RoadmapError::AuthFailed("401".into()).is_remote_access());
        assert!(!RoadmapError::NotFound("#4".into()).is_remote_access());
        assert!(!RoadmapError::Config("x".into()).is_remote_access());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(RoadmapError::Config("both force flags".into()).is_configuration());
        assert!(RoadmapError::MissingConfig("github.repo".into()).is_configuration());
        assert!(!RoadmapError::Transport("down".into()).is_configuration());
    }

    #[test]
    fn test_structured_error_from_error() {
        let err = RoadmapError::IssueNotFound("a1b2c3d4".into());
        let structured = err.to_structured();

        assert_eq!(structured.code, ErrorCode::IssueNotFound);
        assert_eq!(structured.numeric_code, 101);
        assert!(structured.message.contains("a1b2c3d4"));
        assert!(structured.suggestion.contains("a1b2c3d4"));
        assert!(structured.recoverable);
        assert_eq!(structured.category, "issue");
    }

    #[test]
    fn test_structured_error_serialization() {
        let err = StructuredError::new(ErrorCode::ConfigInvalid, "bad flags");
        let json = serde_json::to_string(&err).unwrap();

        assert!(json.contains("CONFIG_INVALID"));
        assert!(json.contains("\"numeric_code\":302"));
        assert!(json.contains("\"category\":\"config\""));
    }

    #[test]
    fn test_structured_error_display() {
        let err = StructuredError::new(ErrorCode::NetworkTimeout, "timed out");
        let display = format!("{err}");
        assert!(display.contains("E502"));
        assert!(display.contains("timed out"));
    }
}
