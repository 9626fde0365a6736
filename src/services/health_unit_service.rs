use uuid::Uuid;

use crate::auth::Claims;
use crate::authz;
use crate::database::health_unit_repository::{HealthUnitChanges, HealthUnitRepository};
use crate::database::models::health_unit::{CreateHealthUnit, HealthUnit, UpdateHealthUnit};
use crate::database::models::user::{Profile, UserStatus};
use crate::database::user_repository::UserRepository;
use crate::error::ApiError;

/// Health unit use-cases. Units belong to exactly one administrator; every
/// read and write here is checked against that ownership.
pub struct HealthUnitService {
    units: HealthUnitRepository,
    users: UserRepository,
}

impl HealthUnitService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            units: HealthUnitRepository::new().await?,
            users: UserRepository::new().await?,
        })
    }

    pub async fn add_health_unit(
        &self,
        caller: &Claims,
        unit: CreateHealthUnit,
    ) -> Result<Uuid, ApiError> {
        let admin = self
            .users
            .get_user_by_id(caller.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Administrator not found"))?;

        if admin.profile != Profile::Administrator {
            tracing::warn!(
                "User {} attempted to create a health unit without the administrator profile",
                caller.user_id
            );
            return Err(ApiError::forbidden(
                "Only administrators can create health units",
            ));
        }

        if unit.name.trim().is_empty() {
            return Err(ApiError::bad_request("Health unit name cannot be empty"));
        }

        let status = match &unit.status {
            Some(status) => UserStatus::parse(status).ok_or_else(|| {
                ApiError::unprocessable_entity("Invalid status. Should be 'active' or 'inactive'")
            })?,
            None => UserStatus::Active,
        };

        let id = self
            .units
            .add_health_unit(&unit.name, caller.user_id, status)
            .await?;

        tracing::info!("Health unit {} added by administrator {}", id, caller.user_id);
        Ok(id)
    }

    /// Units of the caller's tenancy. Professionals see their
    /// administrator's units, administrators see their own.
    pub async fn get_health_units(&self, caller: &Claims) -> Result<Vec<HealthUnit>, ApiError> {
        let scope = authz::resolve_list_scope(caller);
        let admin_id = scope.admin_id.ok_or_else(|| {
            tracing::warn!("Professional {} has no administrator", caller.user_id);
            ApiError::forbidden("You don't have permission to access this resource")
        })?;

        Ok(self.units.get_health_units(admin_id).await?)
    }

    pub async fn get_health_unit_by_id(
        &self,
        caller: &Claims,
        unit_id: Uuid,
    ) -> Result<HealthUnit, ApiError> {
        let unit = self
            .units
            .get_health_unit_by_id(unit_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Health unit not found"))?;

        if !authz::can_access_health_unit(caller, unit.admin_id) {
            tracing::warn!(
                "User {} attempted to access health unit {} of another administrator",
                caller.user_id,
                unit_id
            );
            return Err(ApiError::forbidden(
                "Health unit belongs to a different administrator",
            ));
        }

        Ok(unit)
    }

    pub async fn update_health_unit(
        &self,
        caller: &Claims,
        unit_id: Uuid,
        update: UpdateHealthUnit,
    ) -> Result<(), ApiError> {
        let existing = self
            .units
            .get_health_unit_by_id(unit_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Health unit not found"))?;

        if !authz::can_access_health_unit(caller, existing.admin_id) {
            tracing::warn!(
                "User {} attempted to update health unit {} of another administrator",
                caller.user_id,
                unit_id
            );
            return Err(ApiError::forbidden(
                "Health unit belongs to a different administrator",
            ));
        }

        let mut changes = HealthUnitChanges::default();

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ApiError::bad_request("Health unit name cannot be empty"));
            }
            changes.name = Some(name);
        }

        if let Some(status) = update.status {
            changes.status = Some(UserStatus::parse(&status).ok_or_else(|| {
                ApiError::unprocessable_entity("Invalid status. Should be 'active' or 'inactive'")
            })?);
        }

        if changes.is_empty() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        if !self.units.update_health_unit(unit_id, changes).await? {
            tracing::error!("Failed to update health unit {}", unit_id);
            return Err(ApiError::internal_server_error("Failed to update health unit"));
        }

        Ok(())
    }

    /// Delete a unit. Units with recorded attendances cannot be removed;
    /// history would lose its location.
    pub async fn delete_health_unit(&self, caller: &Claims, unit_id: Uuid) -> Result<(), ApiError> {
        let existing = self
            .units
            .get_health_unit_by_id(unit_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Health unit not found"))?;

        if !authz::can_access_health_unit(caller, existing.admin_id) {
            tracing::warn!(
                "User {} attempted to delete health unit {} of another administrator",
                caller.user_id,
                unit_id
            );
            return Err(ApiError::forbidden(
                "Health unit belongs to a different administrator",
            ));
        }

        let attendances = self.units.count_attendances(unit_id).await?;
        if attendances > 0 {
            return Err(ApiError::conflict(
                "Health unit has registered attendances and cannot be deleted",
            ));
        }

        if !self.units.delete_health_unit(unit_id).await? {
            tracing::error!("Failed to delete health unit {}", unit_id);
            return Err(ApiError::internal_server_error("Failed to delete health unit"));
        }

        tracing::info!("Health unit {} deleted by {}", unit_id, caller.user_id);
        Ok(())
    }
}
