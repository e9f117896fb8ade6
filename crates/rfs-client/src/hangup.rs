//! Tracking of hosts whose helper stopped answering.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::CLIENT_TARGET;

static SHARED: Lazy<Arc<HangupRegistry>> = Lazy::new(|| Arc::new(HangupRegistry::default()));

/// Thread-safe set of hosts marked as hung.
///
/// Dispatchers consult the registry before sending so that requests to a
/// host that already timed out in instrumented mode fail immediately.
#[derive(Debug, Default)]
pub struct HangupRegistry {
    hosts: Mutex<HashSet<String>>,
}

impl HangupRegistry {
    /// The process-wide registry used by default.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Marks `host` as hung. Returns `true` if it was not marked before.
    pub fn mark(&self, host: &str) -> bool {
        let inserted = self.lock().insert(host.to_owned());
        if inserted {
            warn!(target: CLIENT_TARGET, host, "host marked as hung");
        }
        inserted
    }

    /// Whether `host` is marked as hung.
    #[must_use]
    pub fn is_hung(&self, host: &str) -> bool {
        self.lock().contains(host)
    }

    /// Clears the mark for `host`. Returns `true` if it was marked.
    pub fn clear(&self, host: &str) -> bool {
        let removed = self.lock().remove(host);
        if removed {
            info!(target: CLIENT_TARGET, host, "hang-up mark cleared");
        }
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.hosts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
