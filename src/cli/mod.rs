//! Command-line interface for fortisync.
//!
//! This module provides the CLI commands and output formatting.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat, SchemaCommands, StateCommands};
pub use output::OutputFormatter;
