//! CLI argument definitions for the call monitor client.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format selection for printed events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// One aligned line of text per event.
    Human,
    /// One JSON object per line.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// One aligned line of text per event.
    Human,
    /// One JSON object per line.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

/// Command-line interface for the call monitor client.
#[derive(Parser, Debug)]
#[command(name = "callmon", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands of the call monitor client.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Connects to the device and prints events until it closes the stream.
    Watch {
        /// Controls how events are rendered.
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        output: OutputFormat,
    },
    /// Decodes a captured monitor stream and prints its events.
    Replay {
        /// Capture file; `-` or omitted reads standard input.
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
        /// Controls how events are rendered.
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        output: OutputFormat,
    },
}

impl CliCommand {
    pub(crate) const fn output(&self) -> OutputFormat {
        match self {
            Self::Watch { output } | Self::Replay { output, .. } => *output,
        }
    }
}
