//! Read-through configuration cache with pub/sub invalidation.

pub mod admin;
pub mod audit;
pub mod cache;
pub mod changes;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod pubsub;
pub mod resilience;
pub mod store;

pub use cache::ConfigCache;
pub use config::ServiceConfig;
pub use lifecycle::{Services, Shutdown};
