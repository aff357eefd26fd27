use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::admin::AdminState;
use crate::audit::ChangeLogRecord;
use crate::cache::CacheStatus;

/// Entries returned by `/api/changes` when the limit key has no usable value.
pub const DEFAULT_CHANGE_LIMIT: usize = 10;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub cache: CacheStatus,
}

#[derive(Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Value,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let cache = state.cache.status();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if cache.store_available { "operational" } else { "degraded" },
        cache,
    })
}

pub async fn get_configs(State(state): State<AdminState>) -> Json<BTreeMap<String, Value>> {
    Json(state.cache.values().await)
}

pub async fn get_config(State(state): State<AdminState>, Path(key): Path<String>) -> Response {
    match state.cache.get(&key, None).await {
        Some(value) => Json(ConfigValue { key, value }).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no value for '{}'", key)),
    }
}

pub async fn put_config(
    State(state): State<AdminState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Response {
    match state.writer.set(&key, value).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            tracing::error!(key = %key, op = "set", kind = e.kind(), error = %e, "Config write failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

pub async fn invalidate_key(State(state): State<AdminState>, Path(key): Path<String>) -> Json<Value> {
    let removed = state.cache.invalidate(&key);
    tracing::info!(key = %key, removed, "Config invalidated via admin API");
    Json(json!({ "key": key, "removed": removed }))
}

pub async fn get_changes(State(state): State<AdminState>) -> Response {
    let limit = state
        .cache
        .get_as::<usize>(&state.change_log_limit_key)
        .await
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_CHANGE_LIMIT);

    match state.audit.recent(limit).await {
        Ok(records) => Json::<Vec<ChangeLogRecord>>(records).into_response(),
        Err(e) => {
            tracing::error!(op = "audit_recent", error = %e, "Failed to read change log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
