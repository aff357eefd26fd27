//! realtime-config service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Reader ──▶ ConfigCache ──hit──▶ LocalCache
//!                  │ miss
//!                  ▼
//!            CircuitState ──open──▶ DefaultsTable
//!                  │ closed
//!                  ▼
//!             ConfigStore (Redis)
//!
//!   Writer ──▶ ConfigStore ──▶ ChangeHook ──▶ AuditLog
//!                                   └──────▶ ChangePublisher ──▶ channel
//!
//!   channel ──▶ InvalidationSubscriber ──▶ LocalCache::invalidate
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use realtime_config::admin::{self, AdminState};
use realtime_config::config::load_config;
use realtime_config::lifecycle::signals::shutdown_on_signal;
use realtime_config::observability::{logging, metrics};
use realtime_config::{Services, Shutdown};

const LISTENER_STOP_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "realtime-config")]
#[command(about = "Read-through configuration cache with pub/sub invalidation", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "realtime-config.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        backend = ?config.backend,
        definitions = config.definitions.len(),
        "realtime-config starting"
    );

    if args.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = Services::build(config)?;
    let shutdown = Arc::new(Shutdown::new());
    services.start_background(&shutdown);
    let mut shutdown_rx = shutdown.subscribe();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown_on_signal(&shutdown).await });
    }

    if services.config.admin.enabled {
        let listener = TcpListener::bind(&services.config.admin.bind_address).await?;
        let router = admin::setup_admin_router(
            AdminState::from_services(&services),
            Duration::from_secs(services.config.admin.request_timeout_secs),
        );
        admin::serve(listener, router, shutdown_rx).await?;
    } else {
        let _ = shutdown_rx.recv().await;
    }

    services.cache.join_listener(LISTENER_STOP_DEADLINE).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
