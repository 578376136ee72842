//! Logging bootstrap.

use crate::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Filter for `level`; `RUST_LOG` directives take precedence.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.level_filter().into())
        .from_env_lossy()
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .init();
}
