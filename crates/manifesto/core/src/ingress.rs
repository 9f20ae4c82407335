use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the current epoch for one orchestrator instance.
///
/// The epoch is a monotonically increasing counter advanced on branch
/// switch; proposals capture it at submission and are classified stale when
/// the counter has moved past their captured value. Instance state, not
/// process-global, so orchestrators in tests stay independent.
pub struct IngressContext {
    epoch: AtomicU64,
}

impl IngressContext {
    pub fn new() -> Self {
        Self {
            epoch: AtomicU64::new(1),
        }
    }

    pub fn current(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Advance the epoch, returning the new value.
    pub fn advance(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_stale(&self, captured: u64) -> bool {
        captured < self.current()
    }
}

impl Default for IngressContext {
    fn default() -> Self {
        Self::new()
    }
}
