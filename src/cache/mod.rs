//! Read-through configuration cache.
//!
//! # Data Flow
//! ```text
//! request handler
//!     → reader.rs (ConfigCache::get)
//!         → local.rs (LocalCache lookup)
//!         → resilience::circuit_breaker (fail fast while the store is down)
//!         → store (remote fetch on miss)
//!         → config::defaults (static fallback)
//!
//! pubsub::subscriber
//!     → local.rs (LocalCache::invalidate on each changed key)
//! ```

pub mod local;
pub mod reader;

pub use local::LocalCache;
pub use reader::{CacheStatus, ConfigCache};
