use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::clock::Clock;

pub const DEFAULT_RATE_LIMIT: u32 = 5000;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(5 * 60);

// Sliding window - one timestamp per admitted request
#[derive(Debug)]
pub struct RateWindow {
    pub timestamps: VecDeque<Instant>,
    pub window_start: Instant,
    // last X-RateLimit-Remaining seen, decremented by our own admissions since
    pub server_remaining: Option<ServerQuota>,
}

#[derive(Debug, Clone, Copy)]
pub struct ServerQuota {
    pub remaining: u32,
    pub observed_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub percentage: f64,
    #[serde(with = "duration_ms")]
    pub resets_in: Duration,
}

/// Client-side sliding window limiter.
///
/// `try_admit` is the only call that spends quota.
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateWindow>,
    limit: AtomicU32,
    period: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limit: u32, period: Duration, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            window: Mutex::new(RateWindow {
                timestamps: VecDeque::new(),
                window_start: now,
                server_remaining: None,
            }),
            limit: AtomicU32::new(limit),
            period,
            clock,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit.load(Ordering::Relaxed)
    }

    // Keeps the history, only the ceiling moves
    pub fn set_limit(&self, limit: u32) {
        self.limit.store(limit, Ordering::Relaxed);
    }

    /// Admit one request, or say how long until a slot frees up.
    pub fn try_admit(&self) -> Result<(), Duration> {
        let now = self.clock.now();
        let limit = self.limit();
        let mut window = self.pruned(now);

        if effective_used(&window, limit) >= limit {
            return Err(self.wait_for_slot(&window, now, limit));
        }

        window.timestamps.push_back(now);
        if let Some(quota) = window.server_remaining.as_mut() {
            quota.remaining = quota.remaining.saturating_sub(1);
        }
        Ok(())
    }

    // Until everything currently tracked has aged out
    pub fn time_until_reset(&self) -> Duration {
        let now = self.clock.now();
        let window = self.pruned(now);
        self.reset_at(&window)
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> RateLimitStatus {
        let now = self.clock.now();
        let limit = self.limit();
        let window = self.pruned(now);

        let used = effective_used(&window, limit).min(limit);
        let remaining = limit - used;
        let percentage = if limit == 0 {
            100.0
        } else {
            f64::from(used) / f64::from(limit) * 100.0
        };

        RateLimitStatus {
            used,
            limit,
            remaining,
            percentage,
            resets_in: self
                .reset_at(&window)
                .map(|at| at.saturating_duration_since(now))
                .unwrap_or(Duration::ZERO),
        }
    }

    // Take the server's word for what's left when it is stricter than ours
    pub fn reconcile(&self, server_remaining: u32) {
        let now = self.clock.now();
        let mut window = self.pruned(now);
        window.server_remaining = Some(ServerQuota {
            remaining: server_remaining,
            observed_at: now,
        });
    }

    fn lock(&self) -> MutexGuard<'_, RateWindow> {
        // bookkeeping state stays valid even if a holder panicked
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pruned(&self, now: Instant) -> MutexGuard<'_, RateWindow> {
        let mut window = self.lock();

        while let Some(oldest) = window.timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.period {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        let period = self.period;
        if window
            .server_remaining
            .is_some_and(|q| now.saturating_duration_since(q.observed_at) >= period)
        {
            window.server_remaining = None;
        }

        // whole window went by with nothing tracked, start a fresh one
        if window.timestamps.is_empty()
            && window.server_remaining.is_none()
            && now.saturating_duration_since(window.window_start) >= period
        {
            window.window_start = now;
        }

        window
    }

    fn reset_at(&self, window: &RateWindow) -> Option<Instant> {
        let local = window.timestamps.back().map(|t| *t + self.period);
        let server = window.server_remaining.map(|q| q.observed_at + self.period);
        local.max(server)
    }

    fn wait_for_slot(&self, window: &RateWindow, now: Instant, limit: u32) -> Duration {
        let mut until = now;
        let tracked = window.timestamps.len();

        // a slot frees once the count drops below the ceiling, which may be
        // several admissions away after the ceiling was lowered
        let blocking = if limit == 0 {
            window.timestamps.back()
        } else if tracked >= limit as usize {
            window.timestamps.get(tracked - limit as usize)
        } else {
            None
        };
        if let Some(at) = blocking {
            until = until.max(*at + self.period);
        }
        // the server says we're out, wait out its window
        if let Some(quota) = window.server_remaining.filter(|q| q.remaining == 0) {
            until = until.max(quota.observed_at + self.period);
        }

        until.saturating_duration_since(now)
    }
}

fn effective_used(window: &RateWindow, limit: u32) -> u32 {
    let local = window.timestamps.len().min(u32::MAX as usize) as u32;
    match window.server_remaining {
        Some(quota) => local.max(limit.saturating_sub(quota.remaining)),
        None => local,
    }
}

pub(crate) mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
    }
}
