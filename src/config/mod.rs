//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → defaults.rs (DefaultsTable from [definitions])
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the process restarts to pick up changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validation;

pub use defaults::DefaultsTable;
pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AuditConfig, BackendKind, CacheConfig, Definition, LogFormat,
    ObservabilityConfig, PubSubConfig, RedisConfig, ServiceConfig,
};
