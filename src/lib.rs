pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod issues;
pub mod sync;
pub mod test_utils;

pub use error::{Result, RoadmapError};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
