//! singletable CLI entry point
//!
//! This is a minimal entrypoint that:
//! 1. Installs the log subscriber (stderr, `RUST_LOG`, default `singletable=info`)
//! 2. Delegates parsing and dispatch to `cli::run`
//! 3. Exits with non-zero on failure
//!
//! The error itself has already been written to stdout as a JSON envelope.

use singletable::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("singletable=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli::run().await.is_err() {
        std::process::exit(1);
    }
}
