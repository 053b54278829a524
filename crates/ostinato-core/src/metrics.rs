use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters the audio thread can bump without logging or locking.
#[derive(Debug, Default)]
pub(crate) struct EngineMetrics {
    blocks_rendered: AtomicU64,
    deadline_misses: AtomicU64,
    lock_timeouts: AtomicU64,
    auto_released: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub blocks_rendered: u64,
    pub deadline_misses: u64,
    pub lock_timeouts: u64,
    pub auto_released: u64,
}

impl EngineMetrics {
    pub(crate) fn record_block(&self, auto_released: usize, missed_deadline: bool) {
        self.blocks_rendered.fetch_add(1, Ordering::Relaxed);
        if auto_released > 0 {
            self.auto_released
                .fetch_add(auto_released as u64, Ordering::Relaxed);
        }
        if missed_deadline {
            self.deadline_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blocks_rendered: self.blocks_rendered.load(Ordering::Relaxed),
            deadline_misses: self.deadline_misses.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            auto_released: self.auto_released.load(Ordering::Relaxed),
        }
    }
}
