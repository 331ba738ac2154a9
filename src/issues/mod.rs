//! Local issue storage.
//!
//! Issues live as YAML files under `<root>/issues/`. The [`IssueStore`]
//! trait is the seam the sync engine depends on; [`FileIssueStore`] is the
//! on-disk implementation and [`MemoryIssueStore`] backs tests.

pub mod memory;
pub mod store;
pub mod types;

pub use memory::{MemoryIssueStore, StoreFailure};
pub use store::{FileIssueStore, IssueStore, validate_issue_id};
pub use types::{FieldSet, Issue, IssueFilter, IssueStatus, Priority};
