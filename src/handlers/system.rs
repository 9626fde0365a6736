use axum::response::Json;
use serde_json::{json, Value};

use crate::bootstrap;
use crate::database::manager::DatabaseManager;
use crate::error::ApiError;

/// GET /api/health - liveness plus a database round trip
pub async fn health() -> Result<Json<Value>, ApiError> {
    DatabaseManager::health_check()
        .await
        .map_err(|e| {
            tracing::warn!("Health check failed: {}", e);
            ApiError::service_unavailable("Database is unreachable")
        })?;

    Ok(Json(json!({
        "detail": {
            "message": "Service is healthy",
            "status_code": 200
        }
    })))
}

/// POST /api/ensure-root - idempotent bootstrap of the root administrator
pub async fn ensure_root() -> Result<Json<Value>, ApiError> {
    let created = bootstrap::ensure_root_user().await?;

    let message = if created {
        "Root user created"
    } else {
        "Root user already exists"
    };

    Ok(Json(json!({
        "detail": {
            "message": message,
            "status_code": 200
        }
    })))
}
