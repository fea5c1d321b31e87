// src/logging.rs

//! Logging setup for `litani` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `-w/--very-verbose` (trace) or `-v/--verbose` (debug)
//! 2. `LITANI_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::CliArgs;

const LOG_ENV: &str = "LITANI_LOG";

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(args: &CliArgs) -> Result<()> {
    fmt()
        .with_max_level(level_for(args))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_for(args: &CliArgs) -> tracing::Level {
    if args.very_verbose {
        return tracing::Level::TRACE;
    }
    if args.verbose {
        return tracing::Level::DEBUG;
    }

    // `Level` parses the usual level names itself; anything
    // unrecognised falls back to the default.
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(tracing::Level::INFO)
}
