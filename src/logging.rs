//! Logging setup for the binary
//!
//! Logs go to stderr so that stdout carries only the CSV result.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: explicit level, then `RUST_LOG`, then `info`
fn filter_directive(level: Option<&str>, env: Option<String>) -> String {
    level
        .map(str::to_string)
        .or(env)
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber
///
/// An unparseable directive falls back to `info`.
pub fn init_logging(level: Option<&str>, json: bool) {
    let directive = filter_directive(level, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        registry.with(layer).init();
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(layer).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::nothing(None, None, "info")]
    #[case::env_only(None, Some("warn"), "warn")]
    #[case::flag_wins(Some("debug"), Some("warn"), "debug")]
    #[case::blank_env(None, Some("  "), "info")]
    fn test_filter_directive(
        #[case] level: Option<&str>,
        #[case] env: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(filter_directive(level, env.map(str::to_string)), expected);
    }
}
