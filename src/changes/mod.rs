//! Config write path and change notification.
//!
//! # Data Flow
//! ```text
//! admin API PUT
//!     → writer.rs (read old value, write new value to the store)
//!     → hook.rs (only if the value changed)
//!         → audit log append (failure logged)
//!         → pubsub::ChangePublisher (failure logged)
//! ```

pub mod hook;
pub mod writer;

pub use hook::ChangeHook;
pub use writer::{ConfigWriter, WriteOutcome};
