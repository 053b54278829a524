use ostinato_core::RateLimiter;
use std::time::{Duration, Instant};

#[test]
fn first_call_is_always_allowed() {
    let mut limiter = RateLimiter::new(Duration::from_millis(100));
    assert!(limiter.allow(Instant::now()));
}

#[test]
fn calls_inside_the_window_are_denied() {
    let mut limiter = RateLimiter::new(Duration::from_millis(100));
    let t0 = Instant::now();

    assert!(limiter.allow(t0));
    assert!(!limiter.allow(t0 + Duration::from_millis(50)));
    assert!(!limiter.allow(t0 + Duration::from_millis(99)));
}

#[test]
fn window_boundary_and_beyond_are_allowed() {
    let mut limiter = RateLimiter::new(Duration::from_millis(100));
    let t0 = Instant::now();

    assert!(limiter.allow(t0));
    assert!(limiter.allow(t0 + Duration::from_millis(100)));
    assert!(!limiter.allow(t0 + Duration::from_millis(150)));
    assert!(limiter.allow(t0 + Duration::from_millis(250)));
}

#[test]
fn denied_calls_do_not_push_the_window_forward() {
    let mut limiter = RateLimiter::new(Duration::from_millis(100));
    let t0 = Instant::now();

    assert!(limiter.allow(t0));
    assert!(!limiter.allow(t0 + Duration::from_millis(90)));
    // The denial above must not count as the last allowed call.
    assert!(limiter.allow(t0 + Duration::from_millis(110)));
}

#[test]
fn reset_reopens_the_gate() {
    let mut limiter = RateLimiter::new(Duration::from_secs(3600));
    let t0 = Instant::now();

    assert!(limiter.allow(t0));
    assert!(!limiter.allow(t0 + Duration::from_millis(1)));
    limiter.reset();
    assert!(limiter.allow(t0 + Duration::from_millis(2)));
}

#[test]
fn zero_interval_never_denies() {
    let mut limiter = RateLimiter::new(Duration::ZERO);
    let t0 = Instant::now();

    assert!(limiter.allow(t0));
    assert!(limiter.allow(t0));
    assert!(limiter.allow(t0 + Duration::from_nanos(1)));
}
