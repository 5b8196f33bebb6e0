//! Logging bootstrap for zfsutil binaries.
//!
//! Library crates only emit through the `log` facade; binaries call [`init`]
//! once to install `env_logger` as the backend.

use env_logger::Builder;

/// Environment variable consulted for the log filter before `RUST_LOG`.
pub const LOG_ENV: &str = "ZFSUTIL_LOG";

/// Install the logger, filtering at `default_level` unless overridden via the environment.
///
/// Calling this more than once is harmless.
pub fn init(default_level: &str) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| default_level.to_string());

    let _ = Builder::new()
        .parse_filters(&filter)
        .format_timestamp_secs()
        .try_init();
}
