use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Helper binary looked up on `PATH` when no explicit path is configured.
pub const DEFAULT_SERVER_PATH: &str = "fs_server";

/// Worker threads requested from the helper with `-t`.
pub const DEFAULT_SERVER_THREADS: u16 = 4;

/// Label used for the helper's host in diagnostics and hang-up tracking.
pub const DEFAULT_HOST: &str = "localhost";

/// How long a caller waits for the next response record.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default helper binary path.
#[must_use]
pub fn default_server_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SERVER_PATH)
}

/// Default host label.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
