//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Group factory call
//!     → connection.rs (bounded TCP connect, connection ID)
//!     → TcpResource handed to the pool
//!     → raw_close drops the stream
//! ```
//!
//! # Design Decisions
//! - Connect is bounded by a timeout so a black-holed address fails fast
//! - Connect failures surface as `io::Error`/`Elapsed` so breakers count them

pub mod connection;

pub use connection::{connect, ConnectionId, TcpResource};
