use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::user::{CreateUser, LoginRequest, UpdateUser, User};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub admin_id: Option<Uuid>,
}

/// POST /api/users - create a user in the caller's tenancy
pub async fn add_user(
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let service = UserService::new().await?;
    let user_id = service.add_user(&caller, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "detail": {
                "message": "User added successfully",
                "user_id": user_id,
                "status_code": 201
            }
        })),
    ))
}

/// POST /api/users/login - authenticate and receive a token
pub async fn login(Json(payload): Json<LoginRequest>) -> Result<Json<Value>, ApiError> {
    let service = UserService::new().await?;
    let login = service.login(payload).await?;

    Ok(Json(json!({
        "detail": {
            "message": "Login successful",
            "user_name": login.user_name,
            "user_id": login.user_id,
            "profile": login.profile,
            "token": login.token,
            "status_code": 200
        }
    })))
}

/// GET /api/users - users of the caller's tenancy
pub async fn get_users(
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let service = UserService::new().await?;
    Ok(Json(service.get_users(&caller, query.admin_id).await?))
}

/// GET /api/users/administrators/list - all administrators
pub async fn get_administrators(
    Extension(_caller): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    let service = UserService::new().await?;
    Ok(Json(service.get_administrators().await?))
}

/// GET /api/users/professionals/list - professionals of one administrator
pub async fn get_professionals(
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let service = UserService::new().await?;
    Ok(Json(
        service.get_professionals(&caller, query.admin_id).await?,
    ))
}

/// GET /api/users/:id
pub async fn get_user_by_id(
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let service = UserService::new().await?;
    Ok(Json(service.get_user_by_id(&caller, user_id).await?))
}

/// PUT /api/users/:id
pub async fn update_user(
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<Value>, ApiError> {
    let service = UserService::new().await?;
    service.update_user(&caller, user_id, payload).await?;

    Ok(Json(json!({
        "detail": {
            "message": "User updated successfully",
            "status_code": 200
        }
    })))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let service = UserService::new().await?;
    service.delete_user(&caller, user_id).await?;

    Ok(Json(json!({
        "detail": {
            "message": "User deleted successfully",
            "status_code": 200
        }
    })))
}
