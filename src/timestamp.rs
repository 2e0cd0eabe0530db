use libc::{CLOCK_MONOTONIC_RAW, clock_gettime, timespec};
use once_cell::sync::Lazy;
use std::time::Instant;

// Decided once so every reading in a run comes from the same clock.
static RAW_CLOCK_AVAILABLE: Lazy<bool> = Lazy::new(|| read_raw_clock().is_some());
static FALLBACK_ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

fn read_raw_clock() -> Option<u128> {
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    unsafe {
        let mut ts: timespec = std::mem::zeroed();
        if clock_gettime(CLOCK_MONOTONIC_RAW, &mut ts) == 0 {
            Some((ts.tv_sec as u128) * 1_000_000_000 + (ts.tv_nsec as u128))
        } else {
            None
        }
    }
}

/// Monotonic nanoseconds, immune to NTP slewing and wall-clock steps.
pub fn monotonic_ns() -> u128 {
    if *RAW_CLOCK_AVAILABLE {
        if let Some(ns) = read_raw_clock() {
            return ns;
        }
    }
    FALLBACK_ANCHOR.elapsed().as_nanos()
}

/// Milliseconds between two `monotonic_ns` readings, keeping the sub-millisecond part.
pub fn elapsed_ms(start_ns: u128, end_ns: u128) -> f64 {
    end_ns.saturating_sub(start_ns) as f64 / 1_000_000.0
}
