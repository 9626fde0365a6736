use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::health_unit::{CreateHealthUnit, HealthUnit, UpdateHealthUnit};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::HealthUnitService;

/// POST /api/health-units - create a unit owned by the calling administrator
pub async fn add_health_unit(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateHealthUnit>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = HealthUnitService::new().await?;
    let health_unit_id = service.add_health_unit(&caller, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "detail": {
                "message": "Health unit added successfully",
                "health_unit_id": health_unit_id,
                "status_code": 201
            }
        })),
    ))
}

/// GET /api/health-units - units of the caller's tenancy
pub async fn get_health_units(
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<HealthUnit>>, ApiError> {
    let service = HealthUnitService::new().await?;
    Ok(Json(service.get_health_units(&caller).await?))
}

/// GET /api/health-units/:id
pub async fn get_health_unit_by_id(
    Extension(caller): Extension<AuthUser>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<HealthUnit>, ApiError> {
    let service = HealthUnitService::new().await?;
    Ok(Json(service.get_health_unit_by_id(&caller, unit_id).await?))
}

/// PUT /api/health-units/:id
pub async fn update_health_unit(
    Extension(caller): Extension<AuthUser>,
    Path(unit_id): Path<Uuid>,
    Json(payload): Json<UpdateHealthUnit>,
) -> Result<Json<Value>, ApiError> {
    let service = HealthUnitService::new().await?;
    service.update_health_unit(&caller, unit_id, payload).await?;

    Ok(Json(json!({
        "detail": {
            "message": "Health unit updated successfully",
            "status_code": 200
        }
    })))
}

/// DELETE /api/health-units/:id
pub async fn delete_health_unit(
    Extension(caller): Extension<AuthUser>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = HealthUnitService::new().await?;
    service.delete_health_unit(&caller, unit_id).await?;

    Ok(Json(json!({
        "detail": {
            "message": "Health unit deleted successfully",
            "status_code": 200
        }
    })))
}
