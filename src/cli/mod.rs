//! CLI module for singletable
//!
//! Provides command-line access to the configured models:
//! - put: create or overwrite a record
//! - get: first record matching some key fields
//! - list: paged listing behind an opaque cursor
//! - delete: remove a record by primary key
//! - describe: show models, indexes and computed fields

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, run_command, Session};
pub use config::{CliConfig, ModelDefinition};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_response, ok_response, parse_item, read_item, write_error, write_response};
