use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::manager::{DatabaseManager, DatabaseError};
use super::models::health_unit::HealthUnit;
use super::models::user::UserStatus;

#[derive(Debug, Default)]
pub struct HealthUnitChanges {
    pub name: Option<String>,
    pub status: Option<UserStatus>,
}

impl HealthUnitChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none()
    }
}

pub struct HealthUnitRepository {
    pool: PgPool,
}

impl HealthUnitRepository {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub async fn add_health_unit(
        &self,
        name: &str,
        admin_id: Uuid,
        status: UserStatus,
    ) -> Result<Uuid, DatabaseError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO health_units (name, admin_id, status) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(admin_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_health_unit_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<HealthUnit>, DatabaseError> {
        let row = sqlx::query("SELECT * FROM health_units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(map_unit_row).transpose()
    }

    /// Owner of a unit, as a single indexed lookup for the credential gate.
    pub async fn admin_of_unit(&self, id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
        let admin_id = sqlx::query_scalar("SELECT admin_id FROM health_units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin_id)
    }

    pub async fn get_health_units(&self, admin_id: Uuid) -> Result<Vec<HealthUnit>, DatabaseError> {
        let rows = sqlx::query("SELECT * FROM health_units WHERE admin_id = $1 ORDER BY name")
            .bind(admin_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(map_unit_row).collect()
    }

    pub async fn update_health_unit(
        &self,
        id: Uuid,
        changes: HealthUnitChanges,
    ) -> Result<bool, DatabaseError> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut builder = sqlx::QueryBuilder::new("UPDATE health_units SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = &changes.name {
            fields.push("name = ").push_bind_unseparated(name);
        }
        if let Some(status) = changes.status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_health_unit(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM health_units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Dependent attendances block deletion (Conflict at the use-case layer).
    pub async fn count_attendances(&self, unit_id: Uuid) -> Result<i64, DatabaseError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attendances WHERE health_unit_id = $1")
                .bind(unit_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

fn map_unit_row(row: PgRow) -> Result<HealthUnit, DatabaseError> {
    let status: String = row.try_get("status")?;

    Ok(HealthUnit {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        admin_id: row.try_get("admin_id")?,
        status: UserStatus::parse(&status)
            .ok_or_else(|| DatabaseError::Decode(format!("unknown status '{}'", status)))?,
    })
}
