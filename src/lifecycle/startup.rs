//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the store, transport, audit log and cache from configuration
//! - Start background tasks (invalidation listener)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)
//! - Background tasks start only in the process that built the services

use std::sync::Arc;

use thiserror::Error;

use crate::audit::{AuditLog, FileAuditLog, MemoryAuditLog};
use crate::cache::ConfigCache;
use crate::changes::{ChangeHook, ConfigWriter};
use crate::config::{BackendKind, DefaultsTable, ServiceConfig};
use crate::lifecycle::Shutdown;
use crate::pubsub::{ChangePublisher, MemoryTransport, RedisTransport, Transport};
use crate::store::pool::PoolError;
use crate::store::{ConfigStore, MemoryStore, RedisPool, RedisStore};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create Redis pool: {0}")]
    Pool(#[from] PoolError),
}

/// Every long-lived component of the service, wired together.
pub struct Services {
    pub config: ServiceConfig,
    pub cache: Arc<ConfigCache>,
    pub transport: Arc<dyn Transport>,
    pub writer: ConfigWriter,
    pub audit: Arc<dyn AuditLog>,
    owner_pid: u32,
}

impl Services {
    /// Build all services. Does not touch the network.
    pub fn build(config: ServiceConfig) -> Result<Self, StartupError> {
        let defaults = DefaultsTable::from_definitions(&config.definitions);

        let (store, transport): (Arc<dyn ConfigStore>, Arc<dyn Transport>) = match config.backend {
            BackendKind::Redis => {
                let pool = Arc::new(RedisPool::new(&config.redis)?);
                (
                    Arc::new(RedisStore::new(pool.clone(), config.redis.key_prefix.clone())),
                    Arc::new(RedisTransport::new(pool)),
                )
            }
            BackendKind::Memory => {
                tracing::warn!("Using in-memory store and channel; values are not shared across processes");
                (Arc::new(MemoryStore::new()), Arc::new(MemoryTransport::new()))
            }
        };

        let audit: Arc<dyn AuditLog> = match &config.audit.path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Recording config changes to file");
                Arc::new(FileAuditLog::new(path))
            }
            None => Arc::new(MemoryAuditLog::new()),
        };

        let cache = Arc::new(ConfigCache::new(
            store.clone(),
            defaults,
            config.cache.retry_interval(),
        ));

        let publisher = ChangePublisher::new(
            transport.clone(),
            config.pubsub.channel_name().map(str::to_string),
        );
        let writer = ConfigWriter::new(store, ChangeHook::new(audit.clone(), publisher))
            .with_local_cache(cache.local().clone());

        Ok(Self {
            config,
            cache,
            transport,
            writer,
            audit,
            owner_pid: std::process::id(),
        })
    }

    /// Start background tasks. Returns whether the listener was started by this call.
    pub fn start_background(&self, shutdown: &Shutdown) -> bool {
        let pid = std::process::id();
        if pid != self.owner_pid {
            tracing::warn!(
                pid,
                owner_pid = self.owner_pid,
                "Not starting invalidation listener outside the bootstrap process"
            );
            return false;
        }

        self.cache.start_listener(
            self.transport.clone(),
            self.config.pubsub.clone(),
            shutdown.subscribe(),
        )
    }
}
