//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! breakers, pools, coordinator produce:
//!     → logging.rs (structured log events, tagged with trace_id)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace ID flows from `Context` into every log line
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
