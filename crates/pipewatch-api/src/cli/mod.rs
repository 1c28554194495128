//! CLI command definitions for the `pwatch` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod execution;
pub mod status;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use workflow::WorkflowCommand;

/// Run and inspect CI/CD monitoring workflows.
#[derive(Parser)]
#[command(name = "pwatch", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and validate workflow definitions.
    #[command(alias = "wf")]
    Workflow {
        #[command(subcommand)]
        action: WorkflowCommand,
    },

    /// Execute a workflow and wait for it to finish.
    Run {
        /// Workflow id.
        workflow_id: String,

        /// Starting context as a JSON object.
        #[arg(long)]
        context: Option<String>,

        /// Register this definition file before running.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Continue a running execution from its last checkpoint.
    Resume {
        /// Execution id.
        execution_id: String,
    },

    /// Resume every execution still marked running.
    Recover,

    /// List executions, newest first.
    #[command(alias = "ls")]
    Executions {
        /// Only executions of this workflow.
        #[arg(long)]
        workflow: Option<String>,

        /// Only executions with this status (running, completed, failed).
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of executions to show.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show one execution with its step records.
    Execution {
        /// Execution id.
        execution_id: String,
    },

    /// Engine statistics.
    Stats,

    /// Start the REST API server.
    Serve {
        /// Port to listen on (default from config.toml, else 3000).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default from config.toml, else 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_context() {
        let cli = Cli::try_parse_from([
            "pwatch",
            "-v",
            "run",
            "build-failure",
            "--context",
            r#"{"build_id": 7}"#,
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run {
                workflow_id,
                context,
                file,
            } => {
                assert_eq!(workflow_id, "build-failure");
                assert_eq!(context.as_deref(), Some(r#"{"build_id": 7}"#));
                assert!(file.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_executions_filters() {
        let cli = Cli::try_parse_from([
            "pwatch", "--json", "executions", "--status", "failed", "--limit", "5",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Executions { status: Some(ref s), limit: Some(5), workflow: None } if s == "failed"
        ));
    }
}
