use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::attendance::{
    Attendance, CreateAttendance, Statistics, UpdateAttendance,
};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::AttendanceService;

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct AttendanceListQuery {
    pub health_unit_id: Option<Uuid>,
    pub model_used: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceShowQuery {
    #[serde(default)]
    pub include_image: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub period: Option<String>,
}

/// POST /api/attendances - record a diagnostic event
pub async fn add_attendance(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateAttendance>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = AttendanceService::new().await?;
    let attendance_id = service.add_attendance(&caller, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "detail": {
                "message": "Attendance added successfully",
                "attendance_id": attendance_id,
                "status_code": 201
            }
        })),
    ))
}

/// GET /api/attendances - paginated, image-truncated list
pub async fn get_attendances(
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<AttendanceListQuery>,
) -> Result<Json<Vec<Attendance>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let service = AttendanceService::new().await?;
    Ok(Json(
        service
            .get_attendances(&caller, query.health_unit_id, query.model_used, limit, offset)
            .await?,
    ))
}

/// GET /api/attendances/:id - full image only when ?include_image=true
pub async fn get_attendance_by_id(
    Extension(caller): Extension<AuthUser>,
    Path(attendance_id): Path<Uuid>,
    Query(query): Query<AttendanceShowQuery>,
) -> Result<Json<Attendance>, ApiError> {
    let service = AttendanceService::new().await?;
    Ok(Json(
        service
            .get_attendance_by_id(&caller, attendance_id, query.include_image)
            .await?,
    ))
}

/// PUT /api/attendances/:id
pub async fn update_attendance(
    Extension(caller): Extension<AuthUser>,
    Path(attendance_id): Path<Uuid>,
    Json(payload): Json<UpdateAttendance>,
) -> Result<Json<Value>, ApiError> {
    let service = AttendanceService::new().await?;
    service
        .update_attendance(&caller, attendance_id, payload)
        .await?;

    Ok(Json(json!({
        "detail": {
            "message": "Attendance updated successfully",
            "status_code": 200
        }
    })))
}

/// DELETE /api/attendances/:id
pub async fn delete_attendance(
    Extension(caller): Extension<AuthUser>,
    Path(attendance_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = AttendanceService::new().await?;
    service.delete_attendance(&caller, attendance_id).await?;

    Ok(Json(json!({
        "detail": {
            "message": "Attendance deleted successfully",
            "status_code": 200
        }
    })))
}

/// GET /api/attendances/statistics/summary - tenancy aggregates
pub async fn get_statistics(
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<Statistics>, ApiError> {
    let period = query.period.as_deref().unwrap_or("month");

    let service = AttendanceService::new().await?;
    Ok(Json(service.get_statistics(&caller, period).await?))
}
