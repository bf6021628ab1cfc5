use tracing_subscriber::EnvFilter;

/// Set to `json` for machine-readable log lines.
pub const LOG_FORMAT_ENV: &str = "EXTCHECK_LOG_FORMAT";

/// True when `EXTCHECK_LOG_FORMAT=json`.
pub fn json_enabled() -> bool {
    std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Install the global subscriber. Logs go to stderr so stdout stays reserved
/// for the report. Calling this twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = json_enabled();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
