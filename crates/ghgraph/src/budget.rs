//! Request budget: the hourly quota tracker and an optional request pacer.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::time::Instant;

use crate::entity::rate_budget::RateBudget;

/// Default interval between checks while suspended on an exhausted quota.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Tracks the remaining request quota and when it resets.
///
/// The tracker starts without a snapshot; callers refresh it from the
/// quota endpoint before the first counted request. The reset instant is
/// kept both as reported and as a deadline on the runtime clock, so waits
/// are measured against the local monotonic clock.
#[derive(Debug, Clone, Default)]
pub struct RateBudgetTracker {
    snapshot: Option<RateBudget>,
    reset_deadline: Option<Instant>,
}

impl RateBudgetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker seeded with a known snapshot.
    pub fn with_snapshot(budget: RateBudget) -> Self {
        let mut tracker = Self::new();
        tracker.apply(budget);
        tracker
    }

    /// Replace the current state with a fresh snapshot.
    pub fn apply(&mut self, budget: RateBudget) {
        let until_reset = (budget.reset_at() - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.reset_deadline = Some(Instant::now() + until_reset);
        self.snapshot = Some(budget);
    }

    /// The latest snapshot, adjusted for requests made since.
    pub fn snapshot(&self) -> Option<&RateBudget> {
        self.snapshot.as_ref()
    }

    /// True until a snapshot has been applied.
    #[inline]
    pub fn needs_refresh(&self) -> bool {
        self.snapshot.is_none()
    }

    /// Count one remote request against the quota. Never goes below zero.
    pub fn consume(&mut self) {
        if let Some(budget) = self.snapshot.as_mut() {
            budget.remaining = budget.remaining.saturating_sub(1);
            budget.used = budget.used.saturating_add(1);
        }
    }

    /// True when a known snapshot has no requests left.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.snapshot.is_some_and(|b| b.remaining == 0)
    }

    #[inline]
    pub fn remaining(&self) -> Option<u32> {
        self.snapshot.map(|b| b.remaining)
    }

    /// Reported reset instant.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.map(|b| b.reset_at())
    }

    /// Time left until the reset deadline, or `None` once it has passed.
    pub fn time_until_reset(&self) -> Option<Duration> {
        let deadline = self.reset_deadline?;
        let now = Instant::now();
        (deadline > now).then(|| deadline - now)
    }

    /// How long to sleep in one suspension step: never longer than `poll`,
    /// never past the reset deadline.
    pub fn next_sleep(&self, poll: Duration) -> Option<Duration> {
        self.time_until_reset().map(|left| left.min(poll))
    }
}

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Proactive request pacing on top of the hourly quota.
#[derive(Clone)]
pub struct RequestPacer {
    inner: Arc<GovernorRateLimiter>,
}

impl RequestPacer {
    /// A pacer allowing `requests_per_second`, or `None` when it is zero.
    pub fn per_second(requests_per_second: u32) -> Option<Self> {
        let rps = NonZeroU32::new(requests_per_second)?;
        Some(Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        })
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer").finish_non_exhaustive()
    }
}
