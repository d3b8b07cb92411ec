//! # Logging
//!
//! `tracing` subscriber setup shared by both binaries. `RUST_LOG` wins over
//! `LOG_LEVEL` when set.

use crate::config::FunctionConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once (warm starts,
/// tests); later calls are ignored.
pub fn init_tracing(config: &FunctionConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    // A subscriber may already be installed
    let _already_set = if config.log_format.eq_ignore_ascii_case("text") {
        builder.try_init()
    } else {
        builder.json().flatten_event(true).try_init()
    };
}

fn default_directive(log_level: &str) -> String {
    let level = match log_level.to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARN" | "WARNING" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    };
    format!("credential_lambdas={level},token_janitor={level},rotation_handler={level},warn")
}
