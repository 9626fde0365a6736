use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserStatus;

/// Persisted health unit, always owned by exactly one administrator.
///
/// Visible only to the owning administrator and to professionals whose
/// `admin_id` equals that owner.
#[derive(Debug, Clone, Serialize)]
pub struct HealthUnit {
    pub id: Uuid,
    pub name: String,
    pub admin_id: Uuid,
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreateHealthUnit {
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateHealthUnit {
    pub name: Option<String>,
    pub status: Option<String>,
}
