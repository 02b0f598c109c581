//! The capability a pooled object must provide.

use std::future::Future;
use std::sync::Arc;
use futures_util::future::BoxFuture;

use crate::error::BoxError;
use crate::resilience::CircuitBreaker;

/// A leasable, closable handle to a backend connection-like object.
///
/// Returning a resource to its pool is done through
/// [`Group::return_resource`](crate::pool::Group::return_resource) or by
/// closing its [`Lease`](crate::pool::Lease); `raw_close` tears down the
/// underlying connection for good.
pub trait Resource: Send + 'static {
    /// Tear down the underlying connection.
    fn raw_close(&mut self) -> Result<(), BoxError>;

    /// Address of the backend this resource talks to.
    fn address(&self) -> &str;

    /// Breaker of the address this resource was created for.
    fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>>;

    fn set_circuit_breaker(&mut self, breaker: Arc<CircuitBreaker>);
}

/// Per-address factory held by a `ResourcePool`.
pub type ResourceFactory<R> = Arc<dyn Fn() -> BoxFuture<'static, Result<R, BoxError>> + Send + Sync>;

/// Box an async closure into a [`ResourceFactory`].
pub fn resource_factory<R, F, Fut>(f: F) -> ResourceFactory<R>
where
    R: Resource,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, Result<R, BoxError>> { Box::pin(f()) })
}
