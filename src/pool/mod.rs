//! Resource pooling.
//!
//! # Responsibilities
//! - Per-address bounded pools with idle eviction ([`ResourcePool`])
//! - Address selection and return routing across pools ([`Group`])
//! - RAII leases that hand resources back on close or drop ([`Lease`])
//!
//! # Design Decisions
//! - Pools are lock-free (`crossbeam::queue::ArrayQueue`); nobody waits for
//!   a resource, a miss creates a new one
//! - Returned resources beyond capacity are closed, never queued

pub mod group;
pub mod lease;
pub mod resource;
pub mod resource_pool;

pub use group::Group;
pub use lease::Lease;
pub use resource::{resource_factory, Resource, ResourceFactory};
pub use resource_pool::{PoolStats, ResourcePool};
