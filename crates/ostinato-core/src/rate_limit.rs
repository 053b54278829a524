use std::time::{Duration, Instant};

/// Explicit time gate for chatty producers: at most one allowed call per
/// `min_interval`. Plain value, no interior mutability; adapters that need
/// debouncing own one and ask it before forwarding an event.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_allowed: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_allowed: None,
        }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        let allowed = match self.last_allowed {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if allowed {
            self.last_allowed = Some(now);
        }
        allowed
    }

    pub fn reset(&mut self) {
        self.last_allowed = None;
    }
}
