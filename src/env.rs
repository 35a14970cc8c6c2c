/// Environment variable names read by [`crate::init::ArcConfig::from_env`]
/// and [`crate::context::EnvLocation`].
///
/// These are purely helpers; the logger itself never touches the
/// environment unless one of those two is used.

/// DSN of the commit endpoint, e.g. `https://telemetry.local/arcs` or `noop://`.
pub const ARC_COMMIT_DSN_ENV: &str = "ARC_COMMIT_DSN";

/// Optional bearer token sent with every commit.
pub const ARC_COMMIT_TOKEN_ENV: &str = "ARC_COMMIT_TOKEN";

/// Value stamped into `details._url` by [`crate::context::EnvLocation`].
pub const ARC_CONTEXT_URL_ENV: &str = "ARC_CONTEXT_URL";

/// Debounce interval in milliseconds.
pub const ARC_DEBOUNCE_MS_ENV: &str = "ARC_DEBOUNCE_MS";

/// Flush as soon as this many arcs are buffered.
pub const ARC_MAX_BATCH_SIZE_ENV: &str = "ARC_MAX_BATCH_SIZE";

/// Flush once the oldest buffered arc is this many milliseconds old.
pub const ARC_MAX_BATCH_AGE_MS_ENV: &str = "ARC_MAX_BATCH_AGE_MS";

/// `true`/`false`: also print events to stdout through the `fmt` layer.
pub const ARC_STDOUT_ENV: &str = "ARC_STDOUT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and empty alike.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
