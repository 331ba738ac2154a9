use clap::ValueEnum;
use console::style;
use serde::Serialize;

use crate::error::{Result, RoadmapError, StructuredError};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable formatted output with colors (default)
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
    /// Plain text without colors
    Plain,
}

impl OutputFormat {
    /// `--json` wins over an explicit `--output-format`.
    #[must_use]
    pub fn from_args(json: bool, format: Option<Self>) -> Self {
        if json {
            Self::Json
        } else {
            format.unwrap_or_default()
        }
    }

    #[must_use]
    pub const fn use_colors(&self) -> bool {
        matches!(self, Self::Human)
    }

    #[must_use]
    pub const fn is_machine_readable(&self) -> bool {
        matches!(self, Self::Json)
    }
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| RoadmapError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// Error envelope printed on stdout in JSON mode.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: StructuredError,
}

/// Report a fatal error in the requested format.
pub fn emit_error(err: &RoadmapError, format: OutputFormat) {
    let structured = err.to_structured();
    let suggestion = structured.suggestion.clone();
    if format.is_machine_readable() {
        let envelope = ErrorEnvelope {
            ok: false,
            error: structured,
        };
        if let Ok(payload) = serde_json::to_string_pretty(&envelope) {
            println!("{payload}");
            return;
        }
    }
    let label = if format.use_colors() {
        style("error:").red().bold().to_string()
    } else {
        "error:".to_string()
    };
    eprintln!("{label} {err}");
    eprintln!("  hint: {suggestion}");
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
    colors: bool,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 18,
            colors: true,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 18,
            colors: false,
        }
    }

    #[must_use]
    pub const fn for_format(format: OutputFormat) -> Self {
        if format.use_colors() { Self::new() } else { Self::plain() }
    }

    fn bold(&self, text: &str) -> String {
        if self.colors {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        let line = self.bold(text);
        self.lines.push(line);
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        let line = self.bold(text);
        self.lines.push(line);
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let width = self.key_width;
        if self.colors {
            // Pad before styling; ANSI codes would count toward the width.
            let padded = format!("{key:width$}");
            self.lines
                .push(format!("{} {value}", style(padded).dim()));
        } else {
            self.lines.push(format!("{key:width$} {value}"));
        }
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}
