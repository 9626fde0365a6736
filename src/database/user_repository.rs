use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::manager::{DatabaseManager, DatabaseError};
use super::models::user::{Profile, User, UserStatus};

/// Validated field set applied by an update. Services build this after
/// validation so only typed values reach the database.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile: Option<Profile>,
    pub status: Option<UserStatus>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.profile.is_none()
            && self.status.is_none()
    }
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub async fn add_user(
        &self,
        full_name: &str,
        email: &str,
        password_hash: &str,
        profile: Profile,
        admin_id: Option<Uuid>,
        status: UserStatus,
    ) -> Result<Uuid, DatabaseError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (full_name, email, password_hash, profile, admin_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .bind(profile.as_str())
        .bind(admin_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(map_user_row).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(map_user_row).transpose()
    }

    /// List users, optionally restricted to one administrator's tenancy.
    /// A tenancy filter matches the administrator themselves plus every
    /// professional they own.
    pub async fn get_users(&self, admin_id: Option<Uuid>) -> Result<Vec<User>, DatabaseError> {
        let rows = match admin_id {
            Some(admin_id) => {
                sqlx::query(
                    "SELECT * FROM users WHERE admin_id = $1 OR id = $1 ORDER BY created_at DESC",
                )
                .bind(admin_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM users ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(map_user_row).collect()
    }

    pub async fn get_administrators(&self) -> Result<Vec<User>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT * FROM users WHERE profile = 'administrator' ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_user_row).collect()
    }

    pub async fn get_professionals_by_admin(
        &self,
        admin_id: Uuid,
    ) -> Result<Vec<User>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT * FROM users WHERE profile = 'professional' AND admin_id = $1 ORDER BY created_at DESC",
        )
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_user_row).collect()
    }

    /// Apply a partial update; returns false when no row matched.
    pub async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<bool, DatabaseError> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut builder = sqlx::QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(full_name) = &changes.full_name {
            fields.push("full_name = ").push_bind_unseparated(full_name);
        }
        if let Some(email) = &changes.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(password_hash) = &changes.password_hash {
            fields
                .push("password_hash = ")
                .push_bind_unseparated(password_hash);
        }
        if let Some(profile) = changes.profile {
            fields.push("profile = ").push_bind_unseparated(profile.as_str());
        }
        if let Some(status) = changes.status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn map_user_row(row: PgRow) -> Result<User, DatabaseError> {
    let profile: String = row.try_get("profile")?;
    let status: String = row.try_get("status")?;

    Ok(User {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile: Profile::parse(&profile)
            .ok_or_else(|| DatabaseError::Decode(format!("unknown profile '{}'", profile)))?,
        admin_id: row.try_get("admin_id")?,
        status: UserStatus::parse(&status)
            .ok_or_else(|| DatabaseError::Decode(format!("unknown status '{}'", status)))?,
        created_at: row.try_get("created_at")?,
    })
}
