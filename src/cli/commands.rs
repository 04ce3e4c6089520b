//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fortisync - Declarative FortiManager configuration sync.
#[derive(Parser, Debug)]
#[command(name = "fortisync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "FORTISYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new fortisync project.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration against the resource schemas.
    Validate {
        /// Show warnings as well as errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show what an apply would change.
    Plan {
        /// Show field-level differences.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Apply the configuration to FortiManager.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Continue on errors.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Re-read every managed object and update the state.
    Refresh,

    /// Check for changes made on FortiManager outside fortisync.
    Drift,

    /// Bring an existing object under management.
    Import {
        /// Resource name from the configuration file.
        name: String,

        /// Object id on FortiManager (ignored for singletons).
        id: String,
    },

    /// Delete every managed object.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Continue on errors.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Inspect resource schemas.
    Schema {
        /// Schema subcommand.
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Manage the local state.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// Schema inspection subcommands.
#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// List known resource types.
    List,

    /// Show the fields of one resource type.
    Show {
        /// Resource type name.
        resource_type: String,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show current state.
    Show,

    /// Lock the state.
    Lock {
        /// Lock holder identifier.
        #[arg(long)]
        holder: Option<String>,
    },

    /// Unlock the state.
    Unlock {
        /// Lock ID to unlock.
        #[arg(long)]
        lock_id: Option<String>,

        /// Force unlock (dangerous).
        #[arg(long)]
        force: bool,
    },

    /// Forget a resource without deleting its object.
    Rm {
        /// Resource name.
        name: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log line.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from(["fortisync", "import", "public", "5"]).unwrap();
        match cli.command {
            Commands::Import { name, id } => {
                assert_eq!(name, "public");
                assert_eq!(id, "5");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "fortisync",
            "--output",
            "json",
            "--log-format",
            "json",
            "state",
            "rm",
            "old",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::State { command: StateCommands::Rm { ref name } } if name == "old"
        ));
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
