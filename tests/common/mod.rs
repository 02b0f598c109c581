//! Shared utilities for integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use backend_pool::{BoxError, CircuitBreaker, Group, PoolOptions, Resource};
use tokio::net::TcpListener;

/// In-memory resource that counts its own teardown.
#[derive(Debug)]
pub struct MockResource {
    pub id: usize,
    pub address: String,
    breaker: Option<Arc<CircuitBreaker>>,
    counters: Arc<Counters>,
}

impl Resource for MockResource {
    fn raw_close(&mut self) -> Result<(), BoxError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
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

/// Creation/teardown counters shared by every resource of a [`MockBackends`].
#[derive(Debug, Default)]
pub struct Counters {
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Counters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A set of fake backends whose reachability tests can flip at runtime.
#[derive(Debug, Clone, Default)]
pub struct MockBackends {
    pub counters: Arc<Counters>,
    down: Arc<Mutex<HashSet<String>>>,
}

impl MockBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, address: &str, down: bool) {
        let mut set = self.down.lock().expect("down set mutex poisoned");
        if down {
            set.insert(address.to_string());
        } else {
            set.remove(address);
        }
    }

    /// A resource for `address` that no pool produced.
    #[allow(dead_code)]
    pub fn orphan(&self, address: &str) -> MockResource {
        MockResource {
            id: usize::MAX,
            address: address.to_string(),
            breaker: None,
            counters: self.counters.clone(),
        }
    }

    /// Factory suitable for [`Group::new`].
    pub fn factory(&self) -> impl Fn(String) -> BoxFuture<'static, Result<MockResource, BoxError>> + Send + Sync + 'static {
        let backends = self.clone();
        move |address: String| -> BoxFuture<'static, Result<MockResource, BoxError>> {
            let backends = backends.clone();
            Box::pin(async move {
                let down = backends.down.lock().expect("down set mutex poisoned").contains(&address);
                if down {
                    let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, format!("{} refused", address));
                    return Err::<MockResource, BoxError>(err.into());
                }
                let id = backends.counters.created.fetch_add(1, Ordering::SeqCst);
                Ok(MockResource { id, address, breaker: None, counters: backends.counters.clone() })
            })
        }
    }

    pub async fn group(&self, addresses: &[&str], options: PoolOptions) -> Group<MockResource> {
        let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        Group::new(addresses, self.factory(), options).await.unwrap()
    }
}

/// Options with short, test-friendly breaker timings.
pub fn options(init_num: usize, max_cap: usize) -> PoolOptions {
    PoolOptions {
        init_num,
        max_cap,
        idle_timeout_ms: 60_000,
        time_to_open_unit_ms: 1_000,
        time_to_open_max_ms: 10_000,
    }
}

/// Start a TCP backend that accepts and holds connections open.
#[allow(dead_code)]
pub async fn start_tcp_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    address
}

/// An address with nothing listening on it.
#[allow(dead_code)]
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}
