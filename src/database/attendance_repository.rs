use std::collections::HashMap;

use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::manager::{DatabaseManager, DatabaseError};
use super::models::attendance::{
    Attendance, BoundingBox, DiagnosticModel, ModelAccuracy, Statistics, StatsPeriod,
};

/// Insert payload, already authorized and validated by the use-case layer.
#[derive(Debug)]
pub struct NewAttendance {
    pub professional_id: Uuid,
    pub health_unit_id: Uuid,
    pub admin_id: Uuid,
    pub model_used: DiagnosticModel,
    pub model_result: String,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub image_base64: String,
    pub observations: Option<String>,
    pub bounding_boxes: Vec<NewBoundingBox>,
}

/// Geometry-complete box ready for insertion.
#[derive(Debug, Clone)]
pub struct NewBoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    pub observations: Option<String>,
}

#[derive(Debug, Default)]
pub struct AttendanceChanges {
    pub model_used: Option<DiagnosticModel>,
    pub model_result: Option<String>,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub observations: Option<String>,
}

impl AttendanceChanges {
    pub fn is_empty(&self) -> bool {
        self.model_used.is_none()
            && self.model_result.is_none()
            && self.expected_result.is_none()
            && self.correct_diagnosis.is_none()
            && self.observations.is_none()
    }
}

/// Filters for list queries, built from the caller's resolved scope plus
/// optional request parameters.
#[derive(Debug, Default)]
pub struct AttendanceFilter {
    pub admin_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub health_unit_id: Option<Uuid>,
    pub model_used: Option<DiagnosticModel>,
    pub limit: i64,
    pub offset: i64,
}

pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    /// Insert an attendance and its bounding boxes in one transaction.
    /// Boxes are only written for the breast model.
    pub async fn add_attendance(&self, new: NewAttendance) -> Result<Uuid, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO attendances (
                professional_id, health_unit_id, admin_id,
                model_used, model_result, expected_result, correct_diagnosis,
                image_base64, observations
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(new.professional_id)
        .bind(new.health_unit_id)
        .bind(new.admin_id)
        .bind(new.model_used.as_str())
        .bind(&new.model_result)
        .bind(&new.expected_result)
        .bind(new.correct_diagnosis)
        .bind(&new.image_base64)
        .bind(&new.observations)
        .fetch_one(&mut *tx)
        .await?;

        if new.model_used == DiagnosticModel::Breast {
            insert_boxes(&mut tx, id, &new.bounding_boxes).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    pub async fn get_attendance_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<Attendance>, DatabaseError> {
        let row = sqlx::query("SELECT * FROM attendances WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let mut attendance = map_attendance_row(row)?;

        if attendance.model_used == DiagnosticModel::Breast {
            attendance.bounding_boxes = Some(self.boxes_for(&[id]).await?.remove(&id).unwrap_or_default());
        }

        Ok(Some(attendance))
    }

    pub async fn get_attendances(
        &self,
        filter: AttendanceFilter,
    ) -> Result<Vec<Attendance>, DatabaseError> {
        let mut builder = sqlx::QueryBuilder::new("SELECT * FROM attendances WHERE 1=1");
        if let Some(admin_id) = filter.admin_id {
            builder.push(" AND admin_id = ").push_bind(admin_id);
        }
        if let Some(professional_id) = filter.professional_id {
            builder
                .push(" AND professional_id = ")
                .push_bind(professional_id);
        }
        if let Some(health_unit_id) = filter.health_unit_id {
            builder
                .push(" AND health_unit_id = ")
                .push_bind(health_unit_id);
        }
        if let Some(model) = filter.model_used {
            builder.push(" AND model_used = ").push_bind(model.as_str());
        }
        builder
            .push(" ORDER BY attendance_date DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let mut attendances: Vec<Attendance> = rows
            .into_iter()
            .map(map_attendance_row)
            .collect::<Result<_, _>>()?;

        // One batched lookup for every breast record in the page
        let breast_ids: Vec<Uuid> = attendances
            .iter()
            .filter(|a| a.model_used == DiagnosticModel::Breast)
            .map(|a| a.id)
            .collect();
        if !breast_ids.is_empty() {
            let mut boxes = self.boxes_for(&breast_ids).await?;
            for attendance in &mut attendances {
                if attendance.model_used == DiagnosticModel::Breast {
                    attendance.bounding_boxes =
                        Some(boxes.remove(&attendance.id).unwrap_or_default());
                }
            }
        }

        Ok(attendances)
    }

    /// Apply a partial update. When `bounding_boxes` is provided the existing
    /// set is deleted and fully re-inserted inside the same transaction as
    /// the row update, so a crash cannot leave stale or missing boxes.
    pub async fn update_attendance(
        &self,
        id: Uuid,
        changes: AttendanceChanges,
        bounding_boxes: Option<Vec<NewBoundingBox>>,
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let mut touched = false;
        if !changes.is_empty() {
            let mut builder = sqlx::QueryBuilder::new("UPDATE attendances SET ");
            let mut fields = builder.separated(", ");
            if let Some(model) = changes.model_used {
                fields.push("model_used = ").push_bind_unseparated(model.as_str());
            }
            if let Some(model_result) = &changes.model_result {
                fields
                    .push("model_result = ")
                    .push_bind_unseparated(model_result);
            }
            if let Some(expected_result) = &changes.expected_result {
                fields
                    .push("expected_result = ")
                    .push_bind_unseparated(expected_result);
            }
            if let Some(correct_diagnosis) = changes.correct_diagnosis {
                fields
                    .push("correct_diagnosis = ")
                    .push_bind_unseparated(correct_diagnosis);
            }
            if let Some(observations) = &changes.observations {
                fields
                    .push("observations = ")
                    .push_bind_unseparated(observations);
            }
            builder.push(" WHERE id = ").push_bind(id);

            let result = builder.build().execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
            touched = true;
        }

        if let Some(boxes) = bounding_boxes {
            sqlx::query("DELETE FROM bounding_boxes WHERE attendance_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_boxes(&mut tx, id, &boxes).await?;
            touched = true;
        }

        tx.commit().await?;
        Ok(touched)
    }

    /// Delete an attendance and its boxes in one transaction.
    pub async fn delete_attendance(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bounding_boxes WHERE attendance_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM attendances WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Per-model usage counts and accuracy for one tenancy over a window.
    /// An empty window produces zeroed/empty maps, never an error.
    pub async fn get_statistics(
        &self,
        admin_id: Uuid,
        period: StatsPeriod,
    ) -> Result<Statistics, DatabaseError> {
        let usage_rows = sqlx::query(
            r#"
            SELECT model_used, COUNT(*) AS count
            FROM attendances
            WHERE admin_id = $1
              AND attendance_date > now() - $2::interval
            GROUP BY model_used
            "#,
        )
        .bind(admin_id)
        .bind(period.as_interval())
        .fetch_all(&self.pool)
        .await?;

        let accuracy_rows = sqlx::query(
            r#"
            SELECT model_used,
                   COUNT(*) FILTER (WHERE correct_diagnosis = true) AS correct,
                   COUNT(*) AS total
            FROM attendances
            WHERE admin_id = $1
              AND attendance_date > now() - $2::interval
              AND expected_result IS NOT NULL
            GROUP BY model_used
            "#,
        )
        .bind(admin_id)
        .bind(period.as_interval())
        .fetch_all(&self.pool)
        .await?;

        let mut model_usage = HashMap::new();
        for row in usage_rows {
            let model: String = row.try_get("model_used")?;
            let count: i64 = row.try_get("count")?;
            model_usage.insert(model, count);
        }

        let mut model_accuracy = HashMap::new();
        for row in accuracy_rows {
            let model: String = row.try_get("model_used")?;
            let correct: i64 = row.try_get("correct")?;
            let total: i64 = row.try_get("total")?;
            if total > 0 {
                model_accuracy.insert(
                    model,
                    ModelAccuracy {
                        correct,
                        total,
                        accuracy_percentage: accuracy_percentage(correct, total),
                    },
                );
            }
        }

        Ok(Statistics {
            period,
            model_usage,
            model_accuracy,
        })
    }

    async fn boxes_for(
        &self,
        attendance_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<BoundingBox>>, DatabaseError> {
        let rows = sqlx::query("SELECT * FROM bounding_boxes WHERE attendance_id = ANY($1)")
            .bind(attendance_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<BoundingBox>> = HashMap::new();
        for row in rows {
            let bbox = map_box_row(row)?;
            grouped.entry(bbox.attendance_id).or_default().push(bbox);
        }
        Ok(grouped)
    }
}

async fn insert_boxes(
    tx: &mut Transaction<'_, Postgres>,
    attendance_id: Uuid,
    boxes: &[NewBoundingBox],
) -> Result<(), DatabaseError> {
    for bbox in boxes {
        sqlx::query(
            r#"
            INSERT INTO bounding_boxes (
                attendance_id, x, y, width, height, confidence, observations
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(attendance_id)
        .bind(bbox.x)
        .bind(bbox.y)
        .bind(bbox.width)
        .bind(bbox.height)
        .bind(bbox.confidence)
        .bind(&bbox.observations)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// correct/total as a percentage, rounded to 2 decimal places
pub fn accuracy_percentage(correct: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = (correct as f64 / total as f64) * 100.0;
    (ratio * 100.0).round() / 100.0
}

fn map_attendance_row(row: PgRow) -> Result<Attendance, DatabaseError> {
    let model: String = row.try_get("model_used")?;

    Ok(Attendance {
        id: row.try_get("id")?,
        professional_id: row.try_get("professional_id")?,
        health_unit_id: row.try_get("health_unit_id")?,
        admin_id: row.try_get("admin_id")?,
        model_used: DiagnosticModel::parse(&model)
            .ok_or_else(|| DatabaseError::Decode(format!("unknown model '{}'", model)))?,
        model_result: row.try_get("model_result")?,
        expected_result: row.try_get("expected_result")?,
        correct_diagnosis: row.try_get("correct_diagnosis")?,
        image_base64: row.try_get("image_base64")?,
        observations: row.try_get("observations")?,
        attendance_date: row.try_get("attendance_date")?,
        bounding_boxes: None,
    })
}

fn map_box_row(row: PgRow) -> Result<BoundingBox, DatabaseError> {
    Ok(BoundingBox {
        id: row.try_get("id")?,
        attendance_id: row.try_get("attendance_id")?,
        x: row.try_get("x")?,
        y: row.try_get("y")?,
        width: row.try_get("width")?,
        height: row.try_get("height")?,
        confidence: row.try_get("confidence")?,
        observations: row.try_get("observations")?,
    })
}
