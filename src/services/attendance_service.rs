use uuid::Uuid;

use crate::auth::Claims;
use crate::authz;
use crate::database::attendance_repository::{
    AttendanceChanges, AttendanceFilter, AttendanceRepository, NewAttendance, NewBoundingBox,
};
use crate::database::health_unit_repository::HealthUnitRepository;
use crate::database::models::attendance::{
    Attendance, BoundingBoxInput, CreateAttendance, DiagnosticModel, Statistics, StatsPeriod,
    UpdateAttendance,
};
use crate::database::models::user::Profile;
use crate::database::user_repository::UserRepository;
use crate::error::ApiError;

/// Image payloads are megabytes of base64; list and detail responses carry
/// only this prefix unless the caller explicitly asks for the full image.
const IMAGE_PREVIEW_CHARS: usize = 100;

/// Attendance use-cases. An attendance is anchored to the tenancy of the
/// professional who records it: the owning administrator is resolved once at
/// creation and never changes afterwards.
pub struct AttendanceService {
    attendances: AttendanceRepository,
    users: UserRepository,
    units: HealthUnitRepository,
}

impl AttendanceService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            attendances: AttendanceRepository::new().await?,
            users: UserRepository::new().await?,
            units: HealthUnitRepository::new().await?,
        })
    }

    pub async fn add_attendance(
        &self,
        caller: &Claims,
        attendance: CreateAttendance,
    ) -> Result<Uuid, ApiError> {
        let professional = self
            .users
            .get_user_by_id(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Professional not found"))?;

        if professional.profile != Profile::Professional {
            tracing::warn!(
                "User {} attempted to register an attendance without the professional profile",
                caller.user_id
            );
            return Err(ApiError::forbidden(
                "Only professionals can register attendances",
            ));
        }

        let admin_id = professional.admin_id.ok_or_else(|| {
            tracing::error!(
                "Professional {} has no administrator, cannot anchor attendance",
                caller.user_id
            );
            ApiError::bad_request("Professional is not associated with an administrator")
        })?;

        let unit = self
            .units
            .get_health_unit_by_id(attendance.health_unit_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Health unit not found"))?;

        if unit.admin_id != admin_id {
            tracing::warn!(
                "Professional {} attempted to use health unit {} of another administrator",
                caller.user_id,
                attendance.health_unit_id
            );
            return Err(ApiError::forbidden(
                "Health unit belongs to a different administrator",
            ));
        }

        let model = DiagnosticModel::parse(&attendance.model_used).ok_or_else(|| {
            ApiError::unprocessable_entity(format!(
                "Invalid model. Should be one of: {}",
                DiagnosticModel::VALID_MODELS
            ))
        })?;

        if attendance.image_base64.trim().is_empty() {
            return Err(ApiError::bad_request("Image in base64 format is required"));
        }

        let bounding_boxes = attendance.bounding_boxes.unwrap_or_default();
        if model != DiagnosticModel::Breast && !bounding_boxes.is_empty() {
            return Err(ApiError::bad_request(
                "Bounding boxes are only accepted for the breast model",
            ));
        }
        let bounding_boxes = validate_boxes(bounding_boxes)?;

        let id = self
            .attendances
            .add_attendance(NewAttendance {
                professional_id: caller.user_id,
                health_unit_id: attendance.health_unit_id,
                admin_id,
                model_used: model,
                model_result: attendance.model_result,
                expected_result: attendance.expected_result,
                correct_diagnosis: attendance.correct_diagnosis,
                image_base64: attendance.image_base64,
                observations: attendance.observations,
                bounding_boxes,
            })
            .await?;

        tracing::info!("Attendance {} added by professional {}", id, caller.user_id);
        Ok(id)
    }

    /// List attendances visible to the caller. Administrators see their whole
    /// tenancy, professionals only their own records. Images are truncated to
    /// a preview.
    pub async fn get_attendances(
        &self,
        caller: &Claims,
        health_unit_id: Option<Uuid>,
        model_used: Option<String>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Attendance>, ApiError> {
        let model = match model_used {
            Some(value) => Some(DiagnosticModel::parse(&value).ok_or_else(|| {
                ApiError::unprocessable_entity(format!(
                    "Invalid model. Should be one of: {}",
                    DiagnosticModel::VALID_MODELS
                ))
            })?),
            None => None,
        };

        let scope = authz::resolve_list_scope(caller);

        let mut attendances = self
            .attendances
            .get_attendances(AttendanceFilter {
                admin_id: scope.admin_id,
                professional_id: scope.professional_id,
                health_unit_id,
                model_used: model,
                limit,
                offset,
            })
            .await?;

        for attendance in &mut attendances {
            attendance.image_base64 = truncate_image(&attendance.image_base64);
        }

        Ok(attendances)
    }

    pub async fn get_attendance_by_id(
        &self,
        caller: &Claims,
        attendance_id: Uuid,
        include_image: bool,
    ) -> Result<Attendance, ApiError> {
        let mut attendance = self
            .attendances
            .get_attendance_by_id(attendance_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Attendance not found"))?;

        if !authz::can_mutate_attendance(caller, attendance.professional_id, attendance.admin_id) {
            tracing::warn!(
                "User {} attempted to access attendance {} without permission",
                caller.user_id,
                attendance_id
            );
            return Err(ApiError::forbidden(
                "You don't have permission to access this attendance",
            ));
        }

        if !include_image {
            attendance.image_base64 = truncate_image(&attendance.image_base64);
        }

        Ok(attendance)
    }

    pub async fn update_attendance(
        &self,
        caller: &Claims,
        attendance_id: Uuid,
        update: UpdateAttendance,
    ) -> Result<(), ApiError> {
        let existing = self
            .attendances
            .get_attendance_by_id(attendance_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Attendance not found"))?;

        if self.users.get_user_by_id(caller.user_id).await?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }

        if !authz::can_mutate_attendance(caller, existing.professional_id, existing.admin_id) {
            tracing::warn!(
                "User {} attempted to update attendance {} without permission",
                caller.user_id,
                attendance_id
            );
            return Err(ApiError::forbidden(
                "You don't have permission to update this attendance",
            ));
        }

        let model = match update.model_used {
            Some(value) => Some(DiagnosticModel::parse(&value).ok_or_else(|| {
                ApiError::unprocessable_entity(format!(
                    "Invalid model. Should be one of: {}",
                    DiagnosticModel::VALID_MODELS
                ))
            })?),
            None => None,
        };

        // Boxes stay exclusive to the breast model. The check uses the model
        // the record will have after this update, so switching to breast and
        // attaching boxes in one request is allowed.
        if update.bounding_boxes.is_some() {
            let effective_model = model.unwrap_or(existing.model_used);
            if effective_model != DiagnosticModel::Breast {
                return Err(ApiError::bad_request(
                    "Bounding boxes are only accepted for the breast model",
                ));
            }
        }

        let bounding_boxes = match update.bounding_boxes {
            Some(inputs) => Some(validate_boxes(inputs)?),
            // Leaving the breast model clears the stored set in the same
            // transaction, so stale boxes cannot resurface on a later switch
            // back to breast.
            None if existing.model_used == DiagnosticModel::Breast
                && model.is_some_and(|m| m != DiagnosticModel::Breast) =>
            {
                Some(Vec::new())
            }
            None => None,
        };

        let changes = AttendanceChanges {
            model_used: model,
            model_result: update.model_result,
            expected_result: update.expected_result,
            correct_diagnosis: update.correct_diagnosis,
            observations: update.observations,
        };

        if changes.is_empty() && bounding_boxes.is_none() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        if !self
            .attendances
            .update_attendance(attendance_id, changes, bounding_boxes)
            .await?
        {
            tracing::error!("Failed to update attendance {}", attendance_id);
            return Err(ApiError::internal_server_error("Failed to update attendance"));
        }

        Ok(())
    }

    pub async fn delete_attendance(
        &self,
        caller: &Claims,
        attendance_id: Uuid,
    ) -> Result<(), ApiError> {
        let existing = self
            .attendances
            .get_attendance_by_id(attendance_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Attendance not found"))?;

        if self.users.get_user_by_id(caller.user_id).await?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }

        if !authz::can_mutate_attendance(caller, existing.professional_id, existing.admin_id) {
            tracing::warn!(
                "User {} attempted to delete attendance {} without permission",
                caller.user_id,
                attendance_id
            );
            return Err(ApiError::forbidden(
                "You don't have permission to delete this attendance",
            ));
        }

        if !self.attendances.delete_attendance(attendance_id).await? {
            tracing::error!("Failed to delete attendance {}", attendance_id);
            return Err(ApiError::internal_server_error("Failed to delete attendance"));
        }

        tracing::info!("Attendance {} deleted by {}", attendance_id, caller.user_id);
        Ok(())
    }

    /// Usage and accuracy aggregates for the caller's tenancy.
    pub async fn get_statistics(
        &self,
        caller: &Claims,
        period: &str,
    ) -> Result<Statistics, ApiError> {
        let admin = self
            .users
            .get_user_by_id(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Administrator not found"))?;

        if admin.profile != Profile::Administrator {
            return Err(ApiError::forbidden(
                "Only administrators can access statistics",
            ));
        }

        let period = StatsPeriod::parse(period).ok_or_else(|| {
            ApiError::unprocessable_entity(format!(
                "Invalid period. Should be one of: {}",
                StatsPeriod::VALID_PERIODS
            ))
        })?;

        Ok(self.attendances.get_statistics(admin.id, period).await?)
    }
}

/// Promote raw box payloads to geometry-complete rows, reporting the first
/// missing field by name.
fn validate_boxes(inputs: Vec<BoundingBoxInput>) -> Result<Vec<NewBoundingBox>, ApiError> {
    inputs
        .into_iter()
        .map(|bbox| {
            Ok(NewBoundingBox {
                x: bbox.x.ok_or_else(|| missing_box_field("x"))?,
                y: bbox.y.ok_or_else(|| missing_box_field("y"))?,
                width: bbox.width.ok_or_else(|| missing_box_field("width"))?,
                height: bbox.height.ok_or_else(|| missing_box_field("height"))?,
                confidence: bbox.confidence,
                observations: bbox.observations,
            })
        })
        .collect()
}

fn missing_box_field(field: &str) -> ApiError {
    ApiError::bad_request(format!(
        "Missing required field '{}' in bounding box",
        field
    ))
}

fn truncate_image(image: &str) -> String {
    if image.chars().count() <= IMAGE_PREVIEW_CHARS {
        return image.to_string();
    }
    let preview: String = image.chars().take(IMAGE_PREVIEW_CHARS).collect();
    format!("{preview}...")
}
