//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl-C received → Stop leasing → Close pools → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop workers first, then close pools

pub mod shutdown;

pub use shutdown::Shutdown;
