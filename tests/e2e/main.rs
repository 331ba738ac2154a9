//! E2E test suite entry point.
//!
//! Scenarios run the orchestrator against a file-backed store and the
//! in-memory GitHub double.

mod history;
mod parallel;
mod reconcile;
