//! Admin HTTP API.
//!
//! # Routes
//! ```text
//! GET    /api/status          version, cache size, store and listener health
//! GET    /api/configs         current value of every defined key
//! GET    /api/configs/{key}   one value
//! PUT    /api/configs/{key}   write a value (auth)
//! DELETE /api/cache/{key}     drop a key from this process's cache (auth)
//! GET    /api/changes         most recent change log entries
//! ```

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    handler::Handler,
    middleware,
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::audit::AuditLog;
use crate::cache::ConfigCache;
use crate::changes::ConfigWriter;
use crate::lifecycle::Services;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub cache: Arc<ConfigCache>,
    pub writer: ConfigWriter,
    pub audit: Arc<dyn AuditLog>,
    pub change_log_limit_key: String,
    pub api_key: Option<String>,
}

impl AdminState {
    pub fn from_services(services: &Services) -> Self {
        Self {
            cache: services.cache.clone(),
            writer: services.writer.clone(),
            audit: services.audit.clone(),
            change_log_limit_key: services.config.admin.change_log_limit_key.clone(),
            api_key: services.config.admin.api_key.clone(),
        }
    }
}

/// Build the admin router with all middleware layers.
#[allow(deprecated)]
pub fn setup_admin_router(state: AdminState, request_timeout: Duration) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), admin_auth_middleware);

    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/configs", get(get_configs))
        .route(
            "/api/configs/{key}",
            get(get_config).put(put_config.layer(auth.clone())),
        )
        .route("/api/cache/{key}", delete(invalidate_key.layer(auth)))
        .route("/api/changes", get(get_changes))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
