use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a user holds inside the tenancy hierarchy.
///
/// Administrators own health units and professionals; professionals are
/// scoped to exactly one administrator via `admin_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Administrator,
    Professional,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Administrator => "administrator",
            Profile::Professional => "professional",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "administrator" => Some(Profile::Administrator),
            "professional" => Some(Profile::Professional),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            _ => None,
        }
    }
}

/// Persisted user. `admin_id` is null iff the user is an administrator.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    // Never serialized into API responses
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile: Profile,
    pub admin_id: Option<Uuid>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub profile: String,
    pub admin_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
