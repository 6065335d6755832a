//! In-process sliding-window limiter.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{SWEEP_INTERVAL, WINDOW};

/// Per-key request timestamps plus the time of the last full sweep.
struct Buckets {
    entries: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window limiter keeping one timestamp queue per identity key.
///
/// Admission and the periodic sweep run under the same lock, so a bucket is
/// never observed half-updated.
pub struct LocalWindowLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<Buckets>,
}

impl LocalWindowLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limit: requests_per_minute as usize,
            window: WINDOW,
            buckets: Mutex::new(Buckets {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Admit `key` now, recording the request when allowed.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    pub(crate) fn admit_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");

        if now.saturating_duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            let window = self.window;
            buckets.entries.retain(|_, stamps| {
                evict(stamps, now, window);
                !stamps.is_empty()
            });
            buckets.last_sweep = now;
        }

        let stamps = buckets.entries.entry(key.to_string()).or_default();
        evict(stamps, now, self.window);
        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Number of identity keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.buckets
            .lock()
            .expect("rate limiter mutex poisoned")
            .entries
            .len()
    }
}

fn evict(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = stamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}
