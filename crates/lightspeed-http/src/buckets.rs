//! Rate bucket table and pacing primitives.
//!
//! The server groups routes into quota buckets and reports bucket state
//! on every response (`X-RateLimit-*` headers). [`BucketTable`] tracks
//! the latest observed state per bucket and the route → bucket mapping,
//! which the server may change over time.
//!
//! [`GlobalLimiter`] is the aggregate fallback ceiling: a sliding-window
//! cap on overall call volume, independent of per-route buckets.
//! [`GlobalPause`] is the stall gate armed when the server reports a
//! global-scope 429.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::routes::RouteKey;

/// Latest observed state of one server-side quota bucket.
#[derive(Clone, Debug)]
pub struct Bucket {
    /// Opaque bucket identifier issued by the server.
    pub bucket_id: String,
    /// Total calls allowed per window.
    pub limit: u32,
    /// Calls left before the bucket is exhausted.
    pub remaining: u32,
    /// When the budget resets.
    pub reset_at: Instant,
}

/// Concurrent table of quota buckets keyed by route.
///
/// Reads and writes for different routes never block each other; writes
/// for the same bucket serialize on the entry lock.
#[derive(Debug, Default)]
pub struct BucketTable {
    /// Route key → bucket id. The server may re-map a route to a new
    /// bucket at any time.
    routes: DashMap<RouteKey, String>,
    /// Bucket id → latest observed state.
    buckets: DashMap<String, Bucket>,
}

impl BucketTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the bucket currently mapped to `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &RouteKey) -> Option<Bucket> {
        let bucket_id = self.routes.get(key)?.clone();
        self.buckets.get(&bucket_id).map(|b| b.clone())
    }

    /// Absorb the bucket state reported on a response.
    ///
    /// If the route was previously mapped to a different bucket id, the
    /// mapping is replaced.
    pub fn update(
        &self,
        key: &RouteKey,
        limit: u32,
        remaining: u32,
        reset_after: Duration,
        bucket_id: &str,
    ) {
        match self.routes.insert(key.clone(), bucket_id.to_owned()) {
            Some(previous) if previous != bucket_id => {
                tracing::debug!(route = %key, old = %previous, new = %bucket_id, "route re-mapped to new bucket");
            }
            _ => {}
        }

        let reset_at = Instant::now() + reset_after;
        let _ = self.buckets.insert(
            bucket_id.to_owned(),
            Bucket {
                bucket_id: bucket_id.to_owned(),
                limit,
                remaining,
                reset_at,
            },
        );
    }

    /// How long a call against `key` must wait before it may be issued,
    /// or `None` if the bucket has budget (or is unknown).
    #[must_use]
    pub fn delay_for(&self, key: &RouteKey) -> Option<Duration> {
        let bucket = self.lookup(key)?;
        if bucket.remaining > 0 {
            return None;
        }
        let now = Instant::now();
        (bucket.reset_at > now).then(|| bucket.reset_at - now)
    }
}

/// Sliding-window ceiling on overall call volume.
///
/// The server imposes an aggregate throttle that is not visible in the
/// per-route headers until first violation, so the dispatcher enforces a
/// local ceiling preemptively.
#[derive(Debug)]
pub struct GlobalLimiter {
    max_calls: usize,
    interval: Duration,
    window: parking_lot::Mutex<VecDeque<Instant>>,
}

impl GlobalLimiter {
    /// Allow at most `max_calls` calls per `interval`.
    #[must_use]
    pub fn new(max_calls: usize, interval: Duration) -> Self {
        Self {
            max_calls,
            interval,
            window: parking_lot::Mutex::new(VecDeque::new()),
        }
    }

    /// Suspend until a call slot is available, then claim it.
    ///
    /// Cancel-safe: dropping the future before it resolves releases
    /// nothing, because the slot is only claimed on return.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock();
                let now = Instant::now();
                while window.front().is_some_and(|t| now - *t >= self.interval) {
                    let _ = window.pop_front();
                }
                if window.len() < self.max_calls {
                    window.push_back(now);
                    return;
                }
                // Front is the oldest call still inside the window.
                *window.front().unwrap_or(&now) + self.interval - now
            };
            tracing::debug!(wait_ms = wait.as_millis() as u64, "global call ceiling reached");
            tokio::time::sleep(wait).await;
        }
    }
}

/// Stall gate armed by a global-scope 429.
#[derive(Debug, Default)]
pub struct GlobalPause {
    until: parking_lot::Mutex<Option<Instant>>,
}

impl GlobalPause {
    /// Create an unarmed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate: all waiters stall until `duration` from now.
    /// Never shortens an already-armed longer pause.
    pub fn pause_for(&self, duration: Duration) {
        let target = Instant::now() + duration;
        let mut until = self.until.lock();
        if until.is_none_or(|u| u < target) {
            *until = Some(target);
        }
    }

    /// Suspend while the gate is armed.
    pub async fn wait(&self) {
        loop {
            let deadline = {
                let mut until = self.until.lock();
                let now = Instant::now();
                match *until {
                    Some(t) if t > now => t,
                    _ => {
                        *until = None;
                        return;
                    }
                }
            };
            tokio::time::sleep_until(deadline).await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    use crate::routes::Route;

    fn key(template: &'static str) -> RouteKey {
        Route::new(Method::GET, template).key()
    }

    #[tokio::test]
    async fn lookup_unknown_route_is_none() {
        let table = BucketTable::new();
        assert!(table.lookup(&key("/regions")).is_none());
        assert!(table.delay_for(&key("/regions")).is_none());
    }

    #[tokio::test]
    async fn update_then_lookup_roundtrips() {
        let table = BucketTable::new();
        let k = key("/streams/");
        table.update(&k, 10, 7, Duration::from_secs(3), "bucket-a");

        let bucket = table.lookup(&k).unwrap();
        assert_eq!(bucket.limit, 10);
        assert_eq!(bucket.remaining, 7);
        assert_eq!(bucket.bucket_id, "bucket-a");
        assert!(table.delay_for(&k).is_none());
    }

    #[tokio::test]
    async fn exhausted_bucket_reports_delay_until_reset() {
        tokio::time::pause();
        let table = BucketTable::new();
        let k = key("/streams/");
        table.update(&k, 10, 0, Duration::from_secs(5), "bucket-a");

        let delay = table.delay_for(&k).unwrap();
        assert!(delay <= Duration::from_secs(5));
        assert!(delay > Duration::from_secs(4));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(table.delay_for(&k).is_none());
    }

    #[tokio::test]
    async fn routes_sharing_a_bucket_share_exhaustion() {
        let table = BucketTable::new();
        let a = key("/streams/{stream_id}/bans");
        let b = key("/streams/{stream_id}/moderators");
        table.update(&a, 5, 3, Duration::from_secs(2), "shared");
        table.update(&b, 5, 0, Duration::from_secs(2), "shared");

        // The later update wins for the shared bucket, so both routes
        // now observe an exhausted budget.
        assert!(table.delay_for(&a).is_some());
        assert!(table.delay_for(&b).is_some());
    }

    #[tokio::test]
    async fn route_remap_replaces_mapping() {
        let table = BucketTable::new();
        let k = key("/users/@me");
        table.update(&k, 5, 5, Duration::from_secs(1), "old-bucket");
        table.update(&k, 20, 19, Duration::from_secs(1), "new-bucket");

        assert_eq!(table.lookup(&k).unwrap().bucket_id, "new-bucket");
        assert_eq!(table.lookup(&k).unwrap().limit, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn global_limiter_delays_calls_over_the_ceiling() {
        let limiter = GlobalLimiter::new(2, Duration::from_secs(1));
        let started = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        // Third call must wait for the window to roll.
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn global_pause_stalls_waiters() {
        let pause = GlobalPause::new();
        pause.wait().await; // unarmed: returns immediately

        pause.pause_for(Duration::from_secs(2));
        let started = Instant::now();
        pause.wait().await;
        assert!(started.elapsed() >= Duration::from_secs(2));

        // Gate disarms after expiry.
        let started = Instant::now();
        pause.wait().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn global_pause_keeps_longest_deadline() {
        let pause = GlobalPause::new();
        pause.pause_for(Duration::from_secs(5));
        pause.pause_for(Duration::from_secs(1));

        let started = Instant::now();
        pause.wait().await;
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
