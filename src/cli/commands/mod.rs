//! CLI command implementations
//!
//! Each subcommand has its own module with an Args struct and a `run()`
//! returning the process exit code.

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod link;
pub mod status;
pub mod sync;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<u8> {
    match command {
        Commands::Sync(args) => sync::run(ctx, args),
        Commands::Status(args) => status::run(ctx, args).map(|()| 0),
        Commands::Link(args) => link::run(ctx, args).map(|()| 0),
    }
}
