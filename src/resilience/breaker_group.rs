//! Breaker-aware round-robin address selection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::Context;
use crate::error::PoolError;
use crate::observability::metrics;
use crate::resilience::CircuitBreaker;

/// Ordered breakers for every participating address.
///
/// Breakers are only added while the owning group is being built; selection
/// afterwards needs no lock.
#[derive(Debug, Default)]
pub struct BreakerGroup {
    breakers: Vec<Arc<CircuitBreaker>>,
    counter: AtomicU64,
}

impl BreakerGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_breaker(&mut self, breaker: Arc<CircuitBreaker>) {
        self.breakers.push(breaker);
    }

    /// Pick the next closed breaker in rotation.
    ///
    /// Starts at the rotated index and scans forward, wrapping, over the
    /// remaining breakers.
    pub fn get_available(&self, ctx: &Context) -> Result<Arc<CircuitBreaker>, PoolError> {
        let len = self.breakers.len();
        if len > 0 {
            let c = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            let start = (c % len as u64) as usize;

            for i in 0..len {
                let breaker = &self.breakers[(start + i) % len];
                if !breaker.is_open() {
                    return Ok(breaker.clone());
                }
            }
        }

        let addresses = self.addresses().map(str::to_owned).collect::<Vec<_>>();
        tracing::error!(trace_id = %ctx.trace(), addresses = ?addresses, "All pools were dead");
        metrics::record_all_unavailable();
        Err(PoolError::AllAddressesUnavailable(addresses))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.breakers.iter().map(|b| b.address())
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
