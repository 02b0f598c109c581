//! Group coordinator: one breaker and one pool per address.
//!
//! # Responsibilities
//! - Build a breaker and a pool for each configured address
//! - Exclude addresses whose pool could not produce a resource at startup
//! - Select a healthy address and lease from its pool
//! - Route returned resources back to the pool that owns them
//!
//! # Design Decisions
//! - Bootstrap exclusion is permanent for the lifetime of the group
//! - The address → pool map is never mutated after `new`, so lookups are
//!   lock-free
//! - Pool errors are not reported to breakers; that feedback belongs to the
//!   caller once real work was attempted

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::config::validation::validate_options;
use crate::config::PoolOptions;
use crate::context::Context;
use crate::error::{BoxError, PoolError};
use crate::observability::metrics::CloseReason;
use crate::pool::lease::Lease;
use crate::pool::resource::{resource_factory, Resource, ResourceFactory};
use crate::pool::resource_pool::{close_resource, PoolStats, ResourcePool};
use crate::resilience::{BreakerGroup, CircuitBreaker};

/// Pools and breakers for a set of interchangeable addresses.
pub struct Group<R: Resource> {
    pools: HashMap<String, ResourcePool<R>>,
    breakers: BreakerGroup,
}

impl<R: Resource> Group<R> {
    /// Build the group, running the bootstrap health check for each address.
    ///
    /// `factory` is called with an address and must produce one live
    /// resource for it. Every resource it produces gets the address's
    /// breaker attached.
    pub async fn new<A, F, Fut>(addresses: A, factory: F, options: PoolOptions) -> Result<Self, PoolError>
    where
        A: IntoIterator,
        A::Item: Into<String>,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        validate_options(&options).map_err(PoolError::InvalidOptions)?;

        let factory = Arc::new(factory);
        let mut seen = HashSet::new();
        let mut pools = HashMap::new();
        let mut breakers = BreakerGroup::new();

        for address in addresses {
            let address: String = address.into();
            if !seen.insert(address.clone()) {
                tracing::warn!(address = %address, "Duplicate address ignored");
                continue;
            }

            let breaker = Arc::new(CircuitBreaker::new(
                address.clone(),
                options.time_to_open_unit(),
                options.time_to_open_max(),
            ));
            let pool = ResourcePool::new(
                address.clone(),
                attach_breaker(factory.clone(), address.clone(), breaker.clone()),
                options.init_num,
                options.max_cap,
                options.idle_timeout(),
                breaker.clone(),
            )
            .await?;

            if !pool.available() {
                tracing::warn!(address = %address, "No resource available at startup, address excluded");
                continue;
            }

            tracing::info!(address = %address, resources = pool.len(), "Address registered");
            pools.insert(address, pool);
            breakers.add_breaker(breaker);
        }

        if breakers.is_empty() {
            tracing::error!("No address passed the startup health check");
        }

        Ok(Self { pools, breakers })
    }

    /// Take a resource from whichever healthy address is next in rotation.
    pub async fn get(&self, ctx: &Context) -> Result<R, PoolError> {
        let breaker = self.breakers.get_available(ctx)?;
        let pool = self
            .pools
            .get(breaker.address())
            .ok_or_else(|| PoolError::UnknownAddress(breaker.address().to_string()))?;

        match pool.get(ctx).await {
            Ok(resource) => {
                tracing::debug!(trace_id = %ctx.trace(), address = %pool.address(), "Selected pool");
                Ok(resource)
            }
            Err(e) => {
                tracing::error!(
                    trace_id = %ctx.trace(),
                    address = %pool.address(),
                    error = %e,
                    "Select pool failure"
                );
                Err(e)
            }
        }
    }

    /// Like [`get`](Self::get), wrapped in a guard that returns the resource
    /// when closed or dropped.
    pub async fn lease(self: &Arc<Self>, ctx: &Context) -> Result<Lease<R>, PoolError> {
        let resource = self.get(ctx).await?;
        Ok(Lease::new(Arc::clone(self), ctx.clone(), resource))
    }

    /// Hand a resource back to the pool that owns its address.
    ///
    /// A resource for an address this group does not track is closed.
    pub fn return_resource(&self, ctx: &Context, resource: R, force_close: bool) {
        match self.pools.get(resource.address()) {
            Some(pool) => pool.put(ctx, resource, force_close),
            None => {
                let err = PoolError::UnknownAddress(resource.address().to_string());
                tracing::error!(trace_id = %ctx.trace(), error = %err, "Can't find pool for returned resource, closing it");
                close_resource(ctx, resource, CloseReason::UnknownAddress);
            }
        }
    }

    /// Participating addresses, in selection order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.breakers.addresses()
    }

    pub fn pool(&self, address: &str) -> Option<&ResourcePool<R>> {
        self.pools.get(address)
    }

    /// Close every pool. Later `get` calls fail with `PoolError::Closed`.
    pub fn close(&self, ctx: &Context) {
        for pool in self.pools_in_order() {
            pool.close(ctx);
        }
    }

    pub fn stats(&self) -> Vec<PoolStats> {
        self.pools_in_order().map(ResourcePool::stats).collect()
    }

    /// JSON array of every pool's stats.
    pub fn stats_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.stats())
    }

    fn pools_in_order(&self) -> impl Iterator<Item = &ResourcePool<R>> {
        self.breakers.addresses().filter_map(|a| self.pools.get(a))
    }
}

impl<R: Resource> fmt::Debug for Group<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("pools", &self.pools_in_order().collect::<Vec<_>>())
            .finish()
    }
}

/// Wrap the caller's factory so every resource carries its address's breaker.
fn attach_breaker<R, F, Fut>(factory: Arc<F>, address: String, breaker: Arc<CircuitBreaker>) -> ResourceFactory<R>
where
    R: Resource,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
    resource_factory(move || {
        let created = (*factory)(address.clone());
        let breaker = breaker.clone();
        async move {
            created.await.map(|mut resource| {
                resource.set_circuit_breaker(breaker);
                resource
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Conn {
        address: String,
        closed: Arc<AtomicUsize>,
        breaker: Option<Arc<CircuitBreaker>>,
    }

    impl Resource for Conn {
        fn raw_close(&mut self) -> Result<(), BoxError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn address(&self) -> &str {
            &self.address
        }

        fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
            self.breaker.as_ref()
        }

        fn set_circuit_breaker(&mut self, breaker: Arc<CircuitBreaker>) {
            self.breaker = Some(breaker);
        }
    }

    fn options() -> PoolOptions {
        PoolOptions {
            init_num: 1,
            max_cap: 2,
            idle_timeout_ms: 60_000,
            time_to_open_unit_ms: 1_000,
            time_to_open_max_ms: 10_000,
        }
    }

    async fn group(addresses: &[&str], dead: &'static [&'static str], closed: Arc<AtomicUsize>) -> Group<Conn> {
        let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        Group::new(
            addresses,
            move |address: String| {
                let closed = closed.clone();
                async move {
                    if dead.contains(&address.as_str()) {
                        return Err::<Conn, BoxError>("connection refused".into());
                    }
                    Ok(Conn { address, closed, breaker: None })
                }
            },
            options(),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn resources_carry_their_breaker() {
        let g = group(&["a:1", "b:2"], &[], Arc::default()).await;
        let ctx = Context::background();
        for _ in 0..4 {
            let conn = g.get(&ctx).await.unwrap();
            let breaker = conn.circuit_breaker().unwrap();
            assert_eq!(breaker.address(), conn.address());
            g.return_resource(&ctx, conn, false);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dead_address_is_excluded_at_bootstrap() {
        let g = group(&["a:1", "b:2"], &["a:1"], Arc::default()).await;
        assert_eq!(g.addresses().collect::<Vec<_>>(), ["b:2"]);
        assert!(g.pool("a:1").is_none());

        let ctx = Context::background();
        for _ in 0..5 {
            let conn = g.get(&ctx).await.unwrap();
            assert_eq!(conn.address(), "b:2");
            g.return_resource(&ctx, conn, false);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_addresses_register_once() {
        let g = group(&["a:1", "a:1", "b:2"], &[], Arc::default()).await;
        assert_eq!(g.addresses().collect::<Vec<_>>(), ["a:1", "b:2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn open_breaker_diverts_traffic() {
        let g = group(&["a:1", "b:2"], &[], Arc::default()).await;
        let ctx = Context::background();

        let conn = g.get(&ctx).await.unwrap();
        let victim = conn.address().to_string();
        for _ in 0..3 {
            conn.circuit_breaker().unwrap().report_result(&ctx, false);
        }
        g.return_resource(&ctx, conn, false);

        for _ in 0..6 {
            let conn = g.get(&ctx).await.unwrap();
            assert_ne!(conn.address(), victim);
            g.return_resource(&ctx, conn, false);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn get_fails_when_every_breaker_is_open() {
        let g = group(&["a:1"], &[], Arc::default()).await;
        let ctx = Context::background();
        let conn = g.get(&ctx).await.unwrap();
        for _ in 0..3 {
            conn.circuit_breaker().unwrap().report_result(&ctx, false);
        }
        g.return_resource(&ctx, conn, false);

        assert!(matches!(g.get(&ctx).await, Err(PoolError::AllAddressesUnavailable(_))));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(g.get(&ctx).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_address_is_closed_without_touching_pools() {
        let closed = Arc::new(AtomicUsize::new(0));
        let g = group(&["a:1"], &[], closed.clone()).await;
        let before = g.stats();

        let orphan = Conn { address: "z:9".into(), closed: closed.clone(), breaker: None };
        g.return_resource(&Context::background(), orphan, false);

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(g.stats(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_options_are_rejected() {
        let result = Group::<Conn>::new(
            vec!["a:1"],
            |_address: String| async { Err::<Conn, BoxError>("unused".into()) },
            PoolOptions { max_cap: 0, ..options() },
        )
        .await;
        assert!(matches!(result, Err(PoolError::InvalidOptions(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_json_is_an_array_in_selection_order() {
        let g = group(&["a:1", "b:2"], &[], Arc::default()).await;
        let stats: serde_json::Value = serde_json::from_str(&g.stats_json().unwrap()).unwrap();
        assert_eq!(
            stats,
            serde_json::json!([
                {"address": "a:1", "resourceNum": 1},
                {"address": "b:2", "resourceNum": 1},
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn close_shuts_every_pool() {
        let closed = Arc::new(AtomicUsize::new(0));
        let g = group(&["a:1", "b:2"], &[], closed.clone()).await;
        let ctx = Context::background();
        g.close(&ctx);

        assert_eq!(closed.load(Ordering::SeqCst), 2);
        assert!(matches!(g.get(&ctx).await, Err(PoolError::Closed)));
    }
}
