use serde::Serialize;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::authz;
use crate::database::models::user::{CreateUser, LoginRequest, Profile, UpdateUser, User, UserStatus};
use crate::database::user_repository::{UserChanges, UserRepository};
use crate::error::ApiError;
use crate::password;

#[derive(Debug, Serialize)]
pub struct LoginSuccess {
    pub user_name: String,
    pub user_id: Uuid,
    pub profile: Profile,
    pub token: String,
}

/// User use-cases. Order inside every method is fixed: existence checks,
/// then ownership, then field validation, then the write.
pub struct UserService {
    users: UserRepository,
}

impl UserService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            users: UserRepository::new().await?,
        })
    }

    /// Create a user under the calling administrator's tenancy.
    pub async fn add_user(&self, caller: &Claims, user: CreateUser) -> Result<Uuid, ApiError> {
        if user.full_name.trim().is_empty()
            || user.email.trim().is_empty()
            || user.password.is_empty()
        {
            tracing::warn!("User {} sent an incomplete create-user payload", caller.user_id);
            return Err(ApiError::bad_request(
                "full_name, email and password cannot be empty",
            ));
        }

        let profile = Profile::parse(&user.profile).ok_or_else(|| {
            ApiError::unprocessable_entity(
                "Invalid profile. Should be one of: administrator, professional",
            )
        })?;

        let status = match &user.status {
            Some(status) => UserStatus::parse(status).ok_or_else(|| {
                ApiError::unprocessable_entity("Invalid status. Should be 'active' or 'inactive'")
            })?,
            None => UserStatus::Active,
        };

        if !is_email_valid(&user.email) {
            return Err(ApiError::unprocessable_entity("Invalid email format"));
        }

        // Professionals are always owned by the administrator creating them;
        // administrators carry no owner.
        let admin_id = match profile {
            Profile::Professional => {
                let admin_id = user.admin_id.unwrap_or(caller.user_id);
                if admin_id != caller.user_id {
                    tracing::warn!(
                        "User {} tried to create a professional under another administrator",
                        caller.user_id
                    );
                    return Err(ApiError::forbidden(
                        "Professionals can only be created under your own administration",
                    ));
                }
                Some(admin_id)
            }
            Profile::Administrator => {
                if user.admin_id.is_some() {
                    return Err(ApiError::bad_request(
                        "Administrators cannot be associated with another administrator",
                    ));
                }
                None
            }
        };

        if self.users.get_user_by_email(&user.email).await?.is_some() {
            return Err(ApiError::conflict("User with this email already exists"));
        }

        let password_hash = password::hash_password(&user.password).await?;

        let id = self
            .users
            .add_user(
                &user.full_name,
                &user.email,
                &password_hash,
                profile,
                admin_id,
                status,
            )
            .await?;

        tracing::info!("User {} added by administrator {}", id, caller.user_id);
        Ok(id)
    }

    /// Authenticate by email and password; on success issue a signed token
    /// carrying the stored profile and owning administrator.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginSuccess, ApiError> {
        let user = self
            .users
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Login attempt failed: user {} not found", request.email);
                ApiError::not_found("User not found")
            })?;

        if user.status != UserStatus::Active {
            tracing::warn!("Login attempt failed: user {} is inactive", request.email);
            return Err(ApiError::forbidden("User account is inactive"));
        }

        if !password::verify_password(&request.password, &user.password_hash).await? {
            tracing::warn!("Login attempt failed: incorrect password for {}", request.email);
            return Err(ApiError::unauthorized("Incorrect password"));
        }

        let token = auth::issue_token(
            user.id,
            &user.full_name,
            &user.email,
            user.profile,
            user.admin_id,
        )
        .map_err(|e| {
            tracing::error!("Token issuance failed: {}", e);
            ApiError::internal_server_error("Internal server error during login process")
        })?;

        tracing::info!("User {} logged in successfully", request.email);

        Ok(LoginSuccess {
            user_name: user.full_name,
            user_id: user.id,
            profile: user.profile,
            token,
        })
    }

    /// List users visible to the caller: the whole tenancy for an
    /// administrator, same-tenancy users for a professional.
    pub async fn get_users(
        &self,
        caller: &Claims,
        admin_id: Option<Uuid>,
    ) -> Result<Vec<User>, ApiError> {
        let scope = authz::resolve_list_scope(caller);
        let scope_admin = scope.admin_id.ok_or_else(|| {
            tracing::warn!("Professional {} has no administrator", caller.user_id);
            ApiError::forbidden("You don't have permission to access this resource")
        })?;

        if let Some(requested) = admin_id {
            if requested != scope_admin {
                tracing::warn!(
                    "User {} requested users of another administrator {}",
                    caller.user_id,
                    requested
                );
                return Err(ApiError::forbidden(
                    "You don't have permission to access this resource",
                ));
            }
        }

        Ok(self.users.get_users(Some(scope_admin)).await?)
    }

    pub async fn get_user_by_id(&self, caller: &Claims, user_id: Uuid) -> Result<User, ApiError> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if !authz::can_access_user(caller, user.id, user.admin_id) {
            tracing::warn!(
                "User {} attempted to access data of user {}",
                caller.user_id,
                user_id
            );
            return Err(ApiError::forbidden(
                "You don't have permission to access this user's data",
            ));
        }

        Ok(user)
    }

    pub async fn update_user(
        &self,
        caller: &Claims,
        user_id: Uuid,
        update: UpdateUser,
    ) -> Result<(), ApiError> {
        let existing = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if !authz::can_access_user(caller, existing.id, existing.admin_id) {
            tracing::warn!(
                "User {} attempted to update user {} without permission",
                caller.user_id,
                user_id
            );
            return Err(ApiError::forbidden(
                "You don't have permission to update this user",
            ));
        }

        let mut changes = UserChanges {
            full_name: update.full_name,
            ..Default::default()
        };

        if let Some(email) = update.email {
            if !is_email_valid(&email) {
                return Err(ApiError::unprocessable_entity("Invalid email format"));
            }
            changes.email = Some(email);
        }

        if let Some(profile) = update.profile {
            changes.profile = Some(Profile::parse(&profile).ok_or_else(|| {
                ApiError::unprocessable_entity(
                    "Invalid profile. Should be one of: administrator, professional",
                )
            })?);
        }

        if let Some(status) = update.status {
            changes.status = Some(UserStatus::parse(&status).ok_or_else(|| {
                ApiError::unprocessable_entity("Invalid status. Should be 'active' or 'inactive'")
            })?);
        }

        if let Some(plaintext) = update.password {
            changes.password_hash = Some(password::hash_password(&plaintext).await?);
        }

        if changes.is_empty() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        if !self.users.update_user(user_id, changes).await? {
            tracing::error!("Failed to update user {}", user_id);
            return Err(ApiError::internal_server_error("Failed to update user"));
        }

        Ok(())
    }

    /// Delete a user. The gate already requires the administrator profile;
    /// here the target must belong to the caller's tenancy (or be the caller).
    pub async fn delete_user(&self, caller: &Claims, user_id: Uuid) -> Result<(), ApiError> {
        let existing = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if !authz::can_access_user(caller, existing.id, existing.admin_id) {
            tracing::warn!(
                "User {} attempted to delete user {} without permission",
                caller.user_id,
                user_id
            );
            return Err(ApiError::forbidden(
                "You don't have permission to delete this user",
            ));
        }

        if !self.users.delete_user(user_id).await? {
            tracing::error!("Failed to delete user {}", user_id);
            return Err(ApiError::internal_server_error("Failed to delete user"));
        }

        tracing::info!("User {} deleted by {}", user_id, caller.user_id);
        Ok(())
    }

    pub async fn get_administrators(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.get_administrators().await?)
    }

    /// Professionals under one administrator. Both roles may call this; the
    /// tenancy is always the caller's own.
    pub async fn get_professionals(
        &self,
        caller: &Claims,
        admin_id: Option<Uuid>,
    ) -> Result<Vec<User>, ApiError> {
        let scope = authz::resolve_list_scope(caller);
        let scope_admin = scope.admin_id.ok_or_else(|| {
            ApiError::forbidden("You don't have permission to access this resource")
        })?;

        if let Some(requested) = admin_id {
            if requested != scope_admin {
                tracing::warn!(
                    "User {} requested professionals of another administrator {}",
                    caller.user_id,
                    requested
                );
                return Err(ApiError::forbidden(
                    "You don't have permission to access this resource",
                ));
            }
        }

        let admin = self
            .users
            .get_user_by_id(scope_admin)
            .await?
            .ok_or_else(|| ApiError::not_found("Administrator not found"))?;

        if admin.profile != Profile::Administrator {
            return Err(ApiError::forbidden("User is not an administrator"));
        }

        Ok(self.users.get_professionals_by_admin(scope_admin).await?)
    }
}

/// Minimal structural email check: one '@', non-empty local part, domain
/// with a dot.
pub fn is_email_valid(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}
