//! Error types shared by the pool, the breakers and the coordinator.

use crate::config::validation::ValidationError;

/// Boxed error returned by resource factories and `Resource::raw_close`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced to callers of the pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The context was already canceled (or past its deadline) on entry.
    #[error("resource pool timed out")]
    Timeout,

    /// Every breaker in the group is open, or no address survived bootstrap.
    #[error("all pools were dead: {0:?}")]
    AllAddressesUnavailable(Vec<String>),

    /// The external factory failed to build a resource.
    #[error("failed to create resource for {address}")]
    Factory {
        address: String,
        #[source]
        source: BoxError,
    },

    /// A resource was returned for an address this group does not track.
    #[error("address {0} is not part of this group")]
    UnknownAddress(String),

    /// The pool was closed.
    #[error("resource pool is closed")]
    Closed,

    #[error(
        "invalid pool options: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    InvalidOptions(Vec<ValidationError>),
}
