//! Client-side resource pooling for a set of interchangeable backend addresses.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller
//!       │  Group::get / Group::lease
//!       ▼
//!  ┌──────────────┐   get_available   ┌────────────────────────────┐
//!  │ pool::Group  │──────────────────▶│ resilience::BreakerGroup   │
//!  │ (coordinator)│◀──────────────────│ round-robin, skip open     │
//!  └──────┬───────┘   closed breaker  └────────────────────────────┘
//!         │ lookup by address
//!         ▼
//!  ┌──────────────────────┐   factory (on miss)   ┌──────────────┐
//!  │ pool::ResourcePool   │──────────────────────▶│  Resource    │
//!  │ bounded ArrayQueue   │◀──────────────────────│ (+ breaker)  │
//!  └──────────────────────┘   put / idle evict    └──────────────┘
//! ```
//!
//! The caller reports the outcome of real work to the resource's
//! [`CircuitBreaker`](resilience::CircuitBreaker) and hands the resource back
//! through [`Group::return_resource`](pool::Group::return_resource) or by
//! closing its [`Lease`](pool::Lease).

pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pool;
pub mod resilience;

pub use config::{ClientConfig, PoolOptions};
pub use context::Context;
pub use error::{BoxError, PoolError};
pub use pool::{Group, Lease, Resource, ResourcePool};
pub use resilience::{BreakerGroup, CircuitBreaker};
