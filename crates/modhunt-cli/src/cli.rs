//! CLI argument definitions for `modhunt`.

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for progress and the final report.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Progress lines and a readable summary.
    #[default]
    Human,
    /// A single JSON document; progress goes to the log only.
    Json,
}

/// Command-line interface for the crash finder.
///
/// Configuration flags such as `--server-root` precede these arguments and
/// are routed to the configuration loader.
#[derive(Parser, Debug)]
#[command(name = "modhunt", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub(crate) output: OutputFormat,
    /// Command to run; defaults to `hunt`.
    #[command(subcommand)]
    pub(crate) command: Option<CliCommand>,
}

impl Cli {
    /// Command to run, falling back to `hunt`.
    pub(crate) fn command(&self) -> CliCommand {
        self.command.unwrap_or(CliCommand::Hunt)
    }
}

/// Commands understood by `modhunt`.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Tests each archive in turn until one reproduces the crash.
    Hunt,
    /// Enables every archive, returning the server to its normal state.
    Restore,
    /// Lists archives with their toggle state and plugin id.
    List,
}
