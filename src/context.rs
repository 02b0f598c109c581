//! Per-call context: trace identifier and cancellation.
//!
//! # Responsibilities
//! - Carry an optional trace ID that tags every log line of a call chain
//! - Carry a cancellation signal and optional deadline
//!
//! # Design Decisions
//! - Cancellation is observed only where the pool chooses to check it
//!   (at the entry of `ResourcePool::get`); nothing here interrupts futures
//! - Deadlines use `tokio::time::Instant` so paused-clock tests can drive them

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Call context passed through the pool API.
#[derive(Debug, Clone)]
pub struct Context {
    trace_id: Option<Arc<str>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context tagged with a freshly generated trace ID.
    pub fn new() -> Self {
        Self::background().with_trace_id(Uuid::new_v4().to_string())
    }

    /// A context with no trace ID, never canceled.
    pub fn background() -> Self {
        Self {
            trace_id: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<Arc<str>>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set a deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a context that is canceled together with `self`, but can also
    /// be canceled on its own.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once canceled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Trace ID for log fields; `-` when untagged.
    pub(crate) fn trace(&self) -> &str {
        self.trace_id().unwrap_or("-")
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
