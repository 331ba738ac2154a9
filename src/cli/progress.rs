//! Progress feedback for sync runs.
//!
//! Animated only when stderr is a terminal and output is meant for humans.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::output::OutputFormat;

/// Where progress output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Tty,
    Hidden,
}

impl ProgressMode {
    #[must_use]
    pub fn detect(format: OutputFormat, quiet: bool) -> Self {
        if quiet || format.is_machine_readable() || !std::io::stderr().is_terminal() {
            Self::Hidden
        } else {
            Self::Tty
        }
    }
}

/// Bar counting processed issues. Length is set by the orchestrator.
#[must_use]
pub fn sync_bar(mode: ProgressMode) -> ProgressBar {
    match mode {
        ProgressMode::Hidden => ProgressBar::hidden(),
        ProgressMode::Tty => {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.cyan} syncing [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            {
                bar.set_style(style.progress_chars("█▓▒░"));
            }
            bar
        }
    }
}
