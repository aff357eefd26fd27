//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Cache miss:
//!     → circuit_breaker.rs (skip the remote store while it is known to be down)
//!     → remote read (bounded by the store timeout)
//!     → circuit_breaker.rs (record success or connectivity failure)
//!
//! Subscriber transport error:
//!     → backoff.rs (fixed delay with jitter before reconnecting)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every remote call has a deadline
//! - A failing store is not hammered on every read
//! - "Key not found" is a schema problem and never trips the circuit

pub mod backoff;
pub mod circuit_breaker;

pub use circuit_breaker::{CircuitSnapshot, CircuitState};
