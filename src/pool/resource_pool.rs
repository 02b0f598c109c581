//! Per-address bounded resource pool.
//!
//! # Responsibilities
//! - Pre-populate resources at startup
//! - Hand out queued resources, creating one when the queue is empty
//! - Evict resources that sat idle too long
//! - Drop returned resources once the queue is full
//!
//! # Design Decisions
//! - `get` and `put` never block: pop-or-create, push-or-close
//! - A freshly created resource goes through the same enqueue path as a
//!   returned one before it is popped and handed out
//! - `get` may transiently exceed `max_cap` in flight; the queue bounds the
//!   resident population

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use crossbeam::queue::ArrayQueue;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::validation::ValidationError;
use crate::context::Context;
use crate::error::PoolError;
use crate::observability::metrics::{self, CloseReason};
use crate::pool::resource::{Resource, ResourceFactory};
use crate::resilience::CircuitBreaker;

/// A queued resource and the time it was last enqueued.
struct Idle<R> {
    resource: R,
    enqueued_at: Instant,
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub address: String,
    #[serde(rename = "resourceNum")]
    pub resource_num: usize,
}

/// Bounded concurrent pool of resources for one address.
pub struct ResourcePool<R: Resource> {
    address: String,
    factory: ResourceFactory<R>,
    resources: ArrayQueue<Idle<R>>,
    idle_timeout: Duration,
    circuit_breaker: Arc<CircuitBreaker>,
    closed: AtomicBool,
}

impl<R: Resource> ResourcePool<R> {
    /// Create a pool and try to pre-populate `init_num` resources.
    ///
    /// Factory failures during pre-population are logged and skipped, so the
    /// pool may start with fewer resources, or none.
    pub async fn new(
        address: impl Into<String>,
        factory: ResourceFactory<R>,
        init_num: usize,
        max_cap: usize,
        idle_timeout: Duration,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, PoolError> {
        let mut invalid = Vec::new();
        if max_cap == 0 {
            invalid.push(ValidationError::ZeroCapacity);
        }
        // A zero idle timeout would evict every resource the moment it is queued.
        if idle_timeout.is_zero() {
            invalid.push(ValidationError::ZeroIdleTimeout);
        }
        if !invalid.is_empty() {
            return Err(PoolError::InvalidOptions(invalid));
        }

        let pool = Self {
            address: address.into(),
            factory,
            resources: ArrayQueue::new(max_cap),
            idle_timeout,
            circuit_breaker,
            closed: AtomicBool::new(false),
        };

        let ctx = Context::background();
        for attempt in 0..init_num.min(max_cap) {
            match (pool.factory)().await {
                Ok(resource) => {
                    metrics::record_resource_created(&pool.address);
                    tracing::info!(address = %pool.address, attempt, "Init resource");
                    pool.enqueue(&ctx, resource);
                }
                Err(e) => {
                    tracing::warn!(address = %pool.address, attempt, error = %e, "Init resource failed");
                }
            }
        }

        Ok(pool)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// Number of resources currently queued.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.resources.capacity()
    }

    /// Whether at least one resource is queued right now.
    pub fn available(&self) -> bool {
        !self.resources.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Take a resource, creating one if none is queued.
    ///
    /// Cancellation is checked once, on entry. A resource creation in
    /// progress is never interrupted.
    pub async fn get(&self, ctx: &Context) -> Result<R, PoolError> {
        if ctx.is_done() {
            return Err(PoolError::Timeout);
        }
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let start = Instant::now();
        loop {
            if let Some(idle) = self.resources.pop() {
                let idle_for = idle.enqueued_at.elapsed();
                if idle_for >= self.idle_timeout {
                    tracing::warn!(
                        trace_id = %ctx.trace(),
                        address = %self.address,
                        idle = ?idle_for,
                        available = self.len(),
                        "Got idle timeout resource, closing it"
                    );
                    close_resource(ctx, idle.resource, CloseReason::Idle);
                    continue;
                }

                metrics::record_idle_resources(&self.address, self.len());
                tracing::debug!(
                    trace_id = %ctx.trace(),
                    address = %self.address,
                    available = self.len(),
                    elapsed = ?start.elapsed(),
                    "Got resource from pool"
                );
                return Ok(idle.resource);
            }

            tracing::debug!(
                trace_id = %ctx.trace(),
                address = %self.address,
                "Not enough resources in pool, creating one"
            );
            let resource = match (self.factory)().await {
                Ok(resource) => resource,
                Err(source) => {
                    tracing::error!(
                        trace_id = %ctx.trace(),
                        address = %self.address,
                        error = %source,
                        "Create resource failed"
                    );
                    return Err(PoolError::Factory {
                        address: self.address.clone(),
                        source,
                    });
                }
            };
            metrics::record_resource_created(&self.address);
            tracing::info!(trace_id = %ctx.trace(), address = %self.address, "Created new resource");

            self.enqueue(ctx, resource);
            if self.is_closed() {
                return Err(PoolError::Closed);
            }
        }
    }

    /// Give a resource back. With `force_close` it is torn down instead.
    pub fn put(&self, ctx: &Context, resource: R, force_close: bool) {
        if force_close {
            close_resource(ctx, resource, CloseReason::Forced);
            return;
        }
        self.enqueue(ctx, resource);
    }

    fn enqueue(&self, ctx: &Context, resource: R) {
        if resource.address() != self.address {
            tracing::error!(
                trace_id = %ctx.trace(),
                pool = %self.address,
                address = %resource.address(),
                "FATAL: resource returned to wrong pool"
            );
        }

        if self.is_closed() {
            close_resource(ctx, resource, CloseReason::PoolClosed);
            return;
        }

        let idle = Idle {
            resource,
            enqueued_at: Instant::now(),
        };
        match self.resources.push(idle) {
            Ok(()) => {
                metrics::record_idle_resources(&self.address, self.len());
                tracing::debug!(
                    trace_id = %ctx.trace(),
                    address = %self.address,
                    available = self.len(),
                    "Put resource back"
                );
            }
            Err(Idle { resource, .. }) => {
                tracing::warn!(
                    trace_id = %ctx.trace(),
                    address = %self.address,
                    capacity = self.capacity(),
                    "Pool full, closing returned resource"
                );
                close_resource(ctx, resource, CloseReason::QueueFull);
            }
        }
    }

    /// Stop accepting resources and close every queued one.
    pub fn close(&self, ctx: &Context) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut drained = 0usize;
        while let Some(idle) = self.resources.pop() {
            close_resource(ctx, idle.resource, CloseReason::PoolClosed);
            drained += 1;
        }
        metrics::record_idle_resources(&self.address, 0);
        tracing::info!(trace_id = %ctx.trace(), address = %self.address, drained, "Pool closed");
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            address: self.address.clone(),
            resource_num: self.len(),
        }
    }

    /// `{"address": ..., "resourceNum": ...}`
    pub fn stats_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.stats())
    }
}

impl<R: Resource> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("address", &self.address)
            .field("available", &self.len())
            .field("max_cap", &self.capacity())
            .field("idle_timeout", &self.idle_timeout)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<R: Resource> Drop for ResourcePool<R> {
    fn drop(&mut self) {
        while let Some(mut idle) = self.resources.pop() {
            let _ = idle.resource.raw_close();
        }
    }
}

/// Tear a resource down, logging (not returning) any failure.
pub(crate) fn close_resource<R: Resource>(ctx: &Context, mut resource: R, reason: CloseReason) {
    if let Err(e) = resource.raw_close() {
        tracing::error!(
            trace_id = %ctx.trace(),
            address = %resource.address(),
            error = %e,
            "Close resource failed"
        );
    }
    metrics::record_resource_closed(resource.address(), reason);
    tracing::debug!(
        trace_id = %ctx.trace(),
        address = %resource.address(),
        reason = reason.as_str(),
        "Closed resource"
    );
}
