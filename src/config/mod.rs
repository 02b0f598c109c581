//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → PoolOptions handed to Group::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a group is never re-bound to new options
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ClientConfig;
pub use schema::ConnectConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::PoolOptions;
