//! Host wake mechanism signalled from callback context.
//!
//! `signal` must be idempotent and must never block: it is called on every
//! radio event, possibly many times before the host gets to run `process()`.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

pub trait WakeSignal: Send + Sync {
    /// Schedule a `process()` call soon
    fn signal(&self);
}

/// Stores a single permit; a waiting poll task is woken, otherwise the next
/// `notified().await` returns immediately.
impl WakeSignal for Notify {
    fn signal(&self) {
        self.notify_one();
    }
}

/// Plain pending flag for hosts with a bare main loop
#[derive(Debug, Default)]
pub struct PendingFlag {
    pending: AtomicBool,
}

impl PendingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and return the pending state
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl WakeSignal for PendingFlag {
    fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }
}
