//! Per-connection client settings.

use std::sync::Arc;
use std::time::Duration;

use rfs_config::Config;

use crate::hangup::HangupRegistry;

/// Settings shared by a dispatcher and the responses it creates.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    host: String,
    request_timeout: Duration,
    instrumented: bool,
    hangups: Arc<HangupRegistry>,
}

impl ClientOptions {
    /// Creates options for `host` with the default timeout and the shared
    /// hang-up registry.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            request_timeout: Duration::from_millis(rfs_config::DEFAULT_REQUEST_TIMEOUT_MS),
            instrumented: false,
            hangups: HangupRegistry::shared(),
        }
    }

    /// Derives options from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.host())
            .with_request_timeout(config.request_timeout())
            .with_instrumented(config.instrumented())
    }

    /// Sets how long callers wait for each record.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enables or disables instrumented mode.
    #[must_use]
    pub const fn with_instrumented(mut self, instrumented: bool) -> Self {
        self.instrumented = instrumented;
        self
    }

    /// Uses a private hang-up registry instead of the shared one.
    #[must_use]
    pub fn with_hangups(mut self, hangups: Arc<HangupRegistry>) -> Self {
        self.hangups = hangups;
        self
    }

    /// Host label used in diagnostics.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Default wait for each record.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Whether timeouts mark the host hung and dump diagnostics.
    #[must_use]
    pub const fn instrumented(&self) -> bool {
        self.instrumented
    }

    /// The hang-up registry consulted before sending.
    #[must_use]
    pub fn hangups(&self) -> &HangupRegistry {
        &self.hangups
    }
}
