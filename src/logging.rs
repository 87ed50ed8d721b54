//! Tracing subscriber setup for the CLI.

use std::env;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{
    fmt::{self, time::uptime},
    prelude::*,
    EnvFilter, Registry,
};

/// Filter applied before `RUST_LOG`. This crate at `level`, everything else at warn.
pub fn default_filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,levitate={}", level)
}

/// Installs a compact stderr logger. `RUST_LOG` directives are appended to the default filter.
pub fn init_logging(verbosity: u8) -> Result<(), SetGlobalDefaultError> {
    let format = fmt::format()
        .compact()
        .with_timer(uptime())
        .with_target(false);
    let stderr_log = fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr);

    let mut filter = default_filter(verbosity);
    if let Ok(env_filter) = env::var(EnvFilter::DEFAULT_ENV) {
        filter.push(',');
        filter.push_str(&env_filter);
    }

    let subscriber = Registry::default()
        .with(EnvFilter::new(filter))
        .with(stderr_log);
    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(0), "warn,levitate=info");
        assert_eq!(default_filter(1), "warn,levitate=debug");
        assert_eq!(default_filter(7), "warn,levitate=trace");
    }
}
