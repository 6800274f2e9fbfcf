//! CLI argument definitions using clap
//!
//! Commands:
//! - singletable put --model <name> [--config <path>]
//! - singletable get --model <name> [--config <path>]
//! - singletable list --model <name> [--count N] [--limit N] [--cursor C]
//! - singletable delete --model <name> [--config <path>]
//! - singletable describe [--model <name>] [--config <path>]
//!
//! put/get/list/delete read one JSON object from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// singletable - schema-driven entities over a single shared table
#[derive(Parser, Debug)]
#[command(name = "singletable")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create or overwrite the record read from stdin
    Put {
        /// Path to configuration file
        #[arg(long, default_value = "./singletable.json")]
        config: PathBuf,

        /// Model to operate on
        #[arg(long)]
        model: String,
    },

    /// Fetch the first record matching the key fields read from stdin
    Get {
        /// Path to configuration file
        #[arg(long, default_value = "./singletable.json")]
        config: PathBuf,

        /// Model to operate on
        #[arg(long)]
        model: String,
    },

    /// List records matching the key fields read from stdin (empty input scans)
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./singletable.json")]
        config: PathBuf,

        /// Model to operate on
        #[arg(long)]
        model: String,

        /// Rows to gather across pages
        #[arg(long)]
        count: Option<usize>,

        /// Page size requested from the store
        #[arg(long)]
        limit: Option<usize>,

        /// Cursor returned by a previous list
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Delete the record whose primary key fields are read from stdin
    Delete {
        /// Path to configuration file
        #[arg(long, default_value = "./singletable.json")]
        config: PathBuf,

        /// Model to operate on
        #[arg(long)]
        model: String,
    },

    /// Print the configured models, their indexes and computed fields
    Describe {
        /// Path to configuration file
        #[arg(long, default_value = "./singletable.json")]
        config: PathBuf,

        /// Only this model
        #[arg(long)]
        model: Option<String>,
    },
}

impl Command {
    pub fn config_path(&self) -> &PathBuf {
        match self {
            Command::Put { config, .. }
            | Command::Get { config, .. }
            | Command::List { config, .. }
            | Command::Delete { config, .. }
            | Command::Describe { config, .. } => config,
        }
    }

    /// Whether the command takes a JSON object on stdin.
    pub fn reads_input(&self) -> bool {
        !matches!(self, Command::Describe { .. })
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "singletable",
            "list",
            "--model",
            "player",
            "--limit",
            "2",
            "--config",
            "/tmp/c.json",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::List {
                config: PathBuf::from("/tmp/c.json"),
                model: "player".into(),
                count: None,
                limit: Some(2),
                cursor: None,
            }
        );
        assert!(cli.command.reads_input());
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["singletable", "describe"]).unwrap();
        assert_eq!(cli.command.config_path(), &PathBuf::from("./singletable.json"));
        assert!(!cli.command.reads_input());
    }

    #[test]
    fn test_model_required() {
        assert!(Cli::try_parse_from(["singletable", "put"]).is_err());
    }
}
