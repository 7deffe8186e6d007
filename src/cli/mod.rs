// CLI module
// Command-line interface, argument parsing and command execution

mod args;
mod commands;

pub use args::{BatchesArgs, CliArgs, Command, IngestArgs, OutputFormat, StrategyType};
pub use commands::run;

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (invalid arguments, missing required arguments, or
/// `--help`), clap displays an error message or help text and exits the
/// process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
