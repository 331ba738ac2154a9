//! Shared test utilities for roadmap.

pub mod fixtures;
pub mod logging;

#[cfg(test)]
pub mod arbitrary;

pub use fixtures::{SyncFixture, synced_pair};
pub use logging::TestLogger;
