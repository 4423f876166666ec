//! Archi Inspector CLI entry point.
//!
//! Handles command-line parsing, logging setup, and user-facing error
//! display. The real work lives in [`archi_inspector::cli`]:
//! - `run` - inspect a whole model repository and commit detected drift
//! - `file` - inspect a single entity file (debugging aid)

use anyhow::Result;
use archi_inspector::cli;
use archi_inspector::core::error::user_friendly_error;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Logging rules:
    // 1. RUST_LOG set - use it, verbose flag or not
    // 2. RUST_LOG unset, --verbose - debug level
    // 3. neither - progress at info level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let ctx = user_friendly_error(e);
            ctx.display();
            std::process::exit(1);
        }
    }
}
