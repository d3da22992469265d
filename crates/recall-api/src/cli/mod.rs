//! CLI command definitions for the `recall` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod ingest;
pub mod search;
pub mod status;
pub mod turn;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Classify, pair and search conversation turns.
#[derive(Parser)]
#[command(name = "recall", version, about, long_about = None)]
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

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "RECALL_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a JSONL file of turns through the classification pipeline.
    Ingest {
        /// Path to a file with one JSON turn per line.
        file: PathBuf,

        /// Abandon expired cache entries before reporting.
        #[arg(long)]
        sweep: bool,
    },

    /// Find stored turns similar to an embedding.
    Search {
        /// Query embedding as a JSON array, e.g. "[0.1, 0.2]".
        #[arg(long)]
        embedding: String,

        /// Caller identity (logged, not yet used for scoping).
        #[arg(long, default_value = "")]
        user: String,
    },

    /// Show the latest stored copy of a turn.
    Show {
        /// Turn identifier.
        turn_id: String,
    },

    /// List the stored turns of a session.
    Session {
        /// Session UUID.
        id: Uuid,

        /// Maximum number of turns to list.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// System status.
    Status,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest_with_globals() {
        let cli = Cli::try_parse_from(["recall", "-vv", "--json", "ingest", "turns.jsonl", "--sweep"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        match cli.command {
            Commands::Ingest { file, sweep } => {
                assert_eq!(file, PathBuf::from("turns.jsonl"));
                assert!(sweep);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_parse_session_rejects_bad_uuid() {
        assert!(Cli::try_parse_from(["recall", "session", "not-a-uuid"]).is_err());
    }
}
