use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::errors::ServiceError;
use crate::handlers::AppState;

/// Build/version status for deploy verification
pub async fn api_status() -> Result<Json<Value>, ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");

    Ok(Json(json!({
        "status": "ok",
        "service": "silo-api",
        "version": version,
        "git": git,
        "build_time": build_time,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

/// Liveness + database connectivity
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Ok(Json(json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
