//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: address eligible for selection
//! - Open: address excluded until its cooldown elapses
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures cross a tier (3rd, 6th, 11th, 16th)
//! Open → Closed: cooldown elapsed (evaluated lazily) or any success report
//! ```
//!
//! # Cooldown Tiers
//! ```text
//! failures  3..=5  → 1 × unit
//! failures  6..=10 → 2 × unit
//! failures 11..=15 → 4 × unit
//! failures > 15    → max
//! ```
//!
//! # Design Decisions
//! - Per-address circuit breaker, one per pool
//! - No half-open probing: the first success after the window fully forgives
//! - Fields are independent relaxed atomics; concurrent reporters may lose or
//!   reorder updates. The breaker is a best-effort signal, not an invariant.

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::context::Context;
use crate::observability::metrics;

/// Failure-driven availability state for a single address.
#[derive(Debug)]
pub struct CircuitBreaker {
    address: String,
    fail_count: AtomicU64,
    /// Nanoseconds since `origin` when the breaker last opened; 0 = never.
    open_time: AtomicU64,
    /// Current cooldown in nanoseconds; 0 = closed.
    time_to_open: AtomicU64,
    time_to_open_unit: Duration,
    max_time_to_open: Duration,
    origin: Instant,
}

impl CircuitBreaker {
    pub fn new(address: impl Into<String>, time_to_open_unit: Duration, max_time_to_open: Duration) -> Self {
        Self {
            address: address.into(),
            fail_count: AtomicU64::new(0),
            open_time: AtomicU64::new(0),
            time_to_open: AtomicU64::new(0),
            time_to_open_unit,
            max_time_to_open,
            origin: Instant::now(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Consecutive failures since the last success.
    pub fn fail_count(&self) -> u64 {
        self.fail_count.load(Ordering::Relaxed)
    }

    /// Cooldown applied the last time the breaker opened. Zero when closed.
    pub fn time_to_open(&self) -> Duration {
        Duration::from_nanos(self.time_to_open.load(Ordering::Relaxed))
    }

    /// Classify `err` and record it.
    ///
    /// Transport failures (I/O errors and timeouts anywhere in the source
    /// chain) count against the address; anything else, including `None`,
    /// is a success. Returns the success flag.
    pub fn report_error(&self, ctx: &Context, err: Option<&(dyn Error + 'static)>) -> bool {
        let success = !err.is_some_and(is_network_error);
        self.report_result(ctx, success);
        success
    }

    /// Record the outcome of a call made with a resource from this address.
    pub fn report_outcome<T, E>(&self, ctx: &Context, outcome: &Result<T, E>) -> bool
    where
        E: Error + 'static,
    {
        self.report_error(ctx, outcome.as_ref().err().map(|e| e as &(dyn Error + 'static)))
    }

    pub fn report_result(&self, ctx: &Context, success: bool) {
        if success {
            self.close_breaker();
            return;
        }

        if self.record_failure() {
            metrics::record_breaker_opened(&self.address);
        }

        if self.is_open() {
            tracing::error!(
                trace_id = %ctx.trace(),
                address = %self.address,
                fail_count = self.fail_count(),
                time_to_open = ?self.time_to_open(),
                "Resource is dead, circuit breaker open"
            );
        }
    }

    /// Count one failure. Returns true if it moved the breaker from closed
    /// to open; failures that only restart an open window return false.
    fn record_failure(&self) -> bool {
        let was_open = self.is_open();

        let fail_count = self.fail_count.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(cooldown) = self.cooldown_for(fail_count) {
            self.time_to_open.store(as_nanos(cooldown), Ordering::Relaxed);
            self.open_breaker();
        }

        let max = as_nanos(self.max_time_to_open);
        if self.time_to_open.load(Ordering::Relaxed) > max {
            self.time_to_open.store(max, Ordering::Relaxed);
        }

        !was_open && self.is_open()
    }

    /// True while the current cooldown window has not elapsed.
    pub fn is_open(&self) -> bool {
        let time_to_open = self.time_to_open.load(Ordering::Relaxed);
        if time_to_open == 0 {
            return false;
        }
        let open_time = self.open_time.load(Ordering::Relaxed);
        self.now().saturating_sub(open_time) < time_to_open
    }

    fn cooldown_for(&self, fail_count: u64) -> Option<Duration> {
        let unit = self.time_to_open_unit;
        match fail_count {
            n if n > 15 => Some(self.max_time_to_open),
            n if n > 10 => Some(unit.saturating_mul(4)),
            n if n > 5 => Some(unit.saturating_mul(2)),
            n if n > 2 => Some(unit),
            _ => None,
        }
    }

    fn open_breaker(&self) {
        self.open_time.store(self.now(), Ordering::Relaxed);
    }

    fn close_breaker(&self) {
        self.fail_count.store(0, Ordering::Relaxed);
        self.time_to_open.store(0, Ordering::Relaxed);
        self.open_time.store(0, Ordering::Relaxed);
    }

    fn now(&self) -> u64 {
        as_nanos(self.origin.elapsed())
    }
}

/// True if `err`, or any error in its source chain, is a transport failure.
pub fn is_network_error(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<std::io::Error>() || e.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        current = e.source();
    }
    false
}

fn as_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
