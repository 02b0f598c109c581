//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Group::get
//!     → breaker_group.rs (rotate, skip open breakers)
//!     → address selected
//!
//! Caller finishes work with a resource:
//!     → circuit_breaker.rs (report result, open on repeated failure)
//! ```
//!
//! # Design Decisions
//! - One breaker per address, attached to every resource built for it
//! - Breaker feedback is the caller's job; the pool never reports on its own
//! - Failover happens on the next selection, never inside a single `get`

pub mod breaker_group;
pub mod circuit_breaker;

pub use breaker_group::BreakerGroup;
pub use circuit_breaker::{is_network_error, CircuitBreaker};
