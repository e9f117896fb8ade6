//! Layered configuration for the `rfs` remote file-system client.
//!
//! Values resolve in the order built-in defaults, the TOML file named by
//! `--config-path` (or `RFS_CONFIG_PATH`), `RFS_*` environment variables and
//! finally command-line flags. Loading is delegated to `ortho_config`; this
//! crate only declares the fields and their defaults.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SERVER_PATH,
    DEFAULT_SERVER_THREADS, default_host, default_log_filter, default_log_filter_string,
    default_log_format, default_server_path,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RFS")]
pub struct Config {
    /// Path of the `fs_server` helper binary.
    #[ortho_config(default = default_server_path())]
    server_path: Utf8PathBuf,
    /// Worker threads requested from the helper.
    #[ortho_config(default = DEFAULT_SERVER_THREADS)]
    server_threads: u16,
    /// Whether the helper keeps its directory cache between runs.
    #[ortho_config(default = false)]
    persistence: bool,
    /// Seconds between background refresh cycles; unset disables them.
    refresh_interval_secs: Option<u32>,
    /// Label of the host the helper runs on.
    #[ortho_config(default = default_host())]
    host: String,
    /// Milliseconds a caller waits for each response record.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    request_timeout_ms: u64,
    /// Marks hosts hung and dumps pending requests when a wait times out.
    #[ortho_config(default = false)]
    instrumented: bool,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_path: default_server_path(),
            server_threads: DEFAULT_SERVER_THREADS,
            persistence: false,
            refresh_interval_secs: None,
            host: default_host(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            instrumented: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Path of the `fs_server` helper binary.
    #[must_use]
    pub fn server_path(&self) -> &Utf8Path {
        &self.server_path
    }

    /// Worker threads requested from the helper.
    #[must_use]
    pub const fn server_threads(&self) -> u16 {
        self.server_threads
    }

    /// Whether the helper keeps its directory cache between runs.
    #[must_use]
    pub const fn persistence(&self) -> bool {
        self.persistence
    }

    /// Seconds between the helper's background refresh cycles, if enabled.
    #[must_use]
    pub const fn refresh_interval_secs(&self) -> Option<u32> {
        self.refresh_interval_secs
    }

    /// Label of the host the helper runs on.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// How long a caller waits for each response record.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whether timeouts mark the host hung and dump diagnostics.
    #[must_use]
    pub const fn instrumented(&self) -> bool {
        self.instrumented
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns a copy pointing at a different helper binary.
    #[must_use]
    pub fn with_server_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.server_path = path.into();
        self
    }

    /// Returns a copy with a different host label.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Returns a copy with a different per-record timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Returns a copy with instrumented mode switched on or off.
    #[must_use]
    pub const fn with_instrumented(mut self, instrumented: bool) -> Self {
        self.instrumented = instrumented;
        self
    }

    /// Returns a copy with a different log filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.server_path(), Utf8Path::new("fs_server"));
        assert_eq!(config.server_threads(), 4);
        assert!(!config.persistence());
        assert_eq!(config.refresh_interval_secs(), None);
        assert_eq!(config.host(), "localhost");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.instrumented());
        assert_eq!(config.log_filter(), "warn");
        assert_eq!(config.log_format(), LogFormat::Compact);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = Config::default()
            .with_server_path("/opt/fs_server")
            .with_request_timeout(5)
            .with_instrumented(true)
            .with_log_filter("rfs_client=debug");
        assert_eq!(config.server_path(), Utf8Path::new("/opt/fs_server"));
        assert_eq!(config.log_filter(), "rfs_client=debug");
        assert_eq!(config.request_timeout(), Duration::from_millis(5));
        assert!(config.instrumented());
    }
}
