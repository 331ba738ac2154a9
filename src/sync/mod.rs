//! Bidirectional reconciliation between local issues and GitHub.
//!
//! Pipeline per issue: [`snapshot`] projections, [`diff::compute`],
//! [`classify::classify`] against the stored baseline,
//! [`resolve::resolve`] into a plan, then [`engine::SyncOrchestrator`]
//! applies the plan and records the attempt through [`metadata`].

pub mod classify;
pub mod diff;
pub mod engine;
pub mod lock;
pub mod metadata;
pub mod report;
pub mod resolve;
pub mod snapshot;

pub use classify::{ClassifiedDiff, ClassifiedField, ConflictVerdict};
pub use diff::{FieldChange, FieldDiff};
pub use engine::{CancelToken, Confirm, Selection, SyncOptions, SyncOrchestrator};
pub use lock::{LockHolder, SyncLock};
pub use metadata::{SyncMetadata, SyncMetadataService, SyncRecord, SyncStatistics, SyncStatus};
pub use report::{IssueReport, Summary, SyncOutcome, SyncReport};
pub use resolve::{ConflictResolution, ResolutionMode, ResolutionPlan};
pub use snapshot::{FieldValue, IssueSnapshot, IssueState, SyncField};
