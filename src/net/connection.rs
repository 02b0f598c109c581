//! Pooled TCP connections.
//!
//! # Responsibilities
//! - Open bounded TCP connections to backend addresses
//! - Generate unique connection IDs for tracing
//! - Close the socket when the pool tears the resource down

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::error::BoxError;
use crate::pool::Resource;
use crate::resilience::CircuitBreaker;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is enough since only uniqueness matters.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A TCP connection to one backend address.
#[derive(Debug)]
pub struct TcpResource {
    id: ConnectionId,
    address: String,
    stream: Option<TcpStream>,
    breaker: Option<Arc<CircuitBreaker>>,
}

impl TcpResource {
    pub fn new(address: impl Into<String>, stream: TcpStream) -> Self {
        Self {
            id: ConnectionId::new(),
            address: address.into(),
            stream: Some(stream),
            breaker: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The underlying stream. Fails with `NotConnected` once closed.
    pub fn stream_mut(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl Resource for TcpResource {
    fn raw_close(&mut self) -> Result<(), BoxError> {
        if self.stream.take().is_some() {
            tracing::trace!(connection_id = %self.id, address = %self.address, "Connection closed");
        }
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

/// Connect to `address`, giving up after `timeout`.
///
/// Suitable as a [`Group`](crate::pool::Group) factory:
/// `move |addr| connect(addr, timeout)`.
pub async fn connect(address: String, timeout: Duration) -> Result<TcpResource, BoxError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(address.as_str())).await??;
    stream.set_nodelay(true)?;
    let resource = TcpResource::new(address, stream);
    tracing::debug!(connection_id = %resource.id, address = %resource.address, "Connection established");
    Ok(resource)
}
