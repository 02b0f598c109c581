//! RAII lease over a pooled resource.

use std::error::Error;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::context::Context;
use crate::pool::group::Group;
use crate::pool::resource::Resource;
use crate::resilience::{is_network_error, CircuitBreaker};

/// A resource leased from a [`Group`].
///
/// Closing the lease, or dropping it, returns the resource to its pool.
pub struct Lease<R: Resource> {
    group: Arc<Group<R>>,
    ctx: Context,
    resource: Option<R>,
}

impl<R: Resource> Lease<R> {
    pub(crate) fn new(group: Arc<Group<R>>, ctx: Context, resource: R) -> Self {
        Self {
            group,
            ctx,
            resource: Some(resource),
        }
    }

    pub fn address(&self) -> &str {
        self.resource().address()
    }

    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.resource().circuit_breaker()
    }

    /// Report an error (or `None`) to the address's breaker.
    /// Returns whether it counted as a success.
    pub fn report_error(&self, err: Option<&(dyn Error + 'static)>) -> bool {
        match self.circuit_breaker() {
            Some(breaker) => breaker.report_error(&self.ctx, err),
            None => !err.is_some_and(is_network_error),
        }
    }

    pub fn report_outcome<T, E>(&self, outcome: &Result<T, E>) -> bool
    where
        E: Error + 'static,
    {
        self.report_error(outcome.as_ref().err().map(|e| e as &(dyn Error + 'static)))
    }

    pub fn report_result(&self, success: bool) {
        if let Some(breaker) = self.circuit_breaker() {
            breaker.report_result(&self.ctx, success);
        }
    }

    /// Return the resource to its pool.
    pub fn close(mut self) {
        self.release(false);
    }

    /// Tear the resource down instead of pooling it.
    pub fn discard(mut self) {
        self.release(true);
    }

    /// Detach the resource. The caller becomes responsible for handing it
    /// back through [`Group::return_resource`].
    pub fn into_inner(mut self) -> R {
        self.resource.take().expect("lease already released")
    }

    fn release(&mut self, force_close: bool) {
        if let Some(resource) = self.resource.take() {
            self.group.return_resource(&self.ctx, resource, force_close);
        }
    }

    fn resource(&self) -> &R {
        self.resource.as_ref().expect("lease already released")
    }
}

impl<R: Resource> Deref for Lease<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource()
    }
}

impl<R: Resource> DerefMut for Lease<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource.as_mut().expect("lease already released")
    }
}

impl<R: Resource> Drop for Lease<R> {
    fn drop(&mut self) {
        self.release(false);
    }
}
