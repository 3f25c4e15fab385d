//! Tracing subscriber setup.

use std::env;

use tracing_subscriber::EnvFilter;

pub const LOGGING_LEVEL: &str = "LOGGING_LEVEL";
pub const LOG_FORMAT: &str = "LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: `LOGGING_LEVEL`, then `RUST_LOG`, then `info`.
fn filter_directive(logging_level: Option<String>, rust_log: Option<String>) -> String {
    logging_level
        .into_iter()
        .chain(rust_log)
        .map(|value| value.trim().to_lowercase())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. `LOG_FORMAT=json` selects JSON output.
pub fn init() {
    let directive = filter_directive(env::var(LOGGING_LEVEL).ok(), env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = env::var(LOG_FORMAT).is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
