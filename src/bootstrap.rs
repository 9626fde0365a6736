use crate::config;
use crate::database::models::user::{Profile, UserStatus};
use crate::database::user_repository::UserRepository;
use crate::error::ApiError;
use crate::password;

/// Make sure the configured root administrator exists. Safe to call on every
/// startup and from the bootstrap endpoint; an existing root is left alone.
pub async fn ensure_root_user() -> Result<bool, ApiError> {
    let root = &config::config().root_user;

    let profile = Profile::parse(&root.profile).ok_or_else(|| {
        tracing::error!("Root user profile {:?} is not a valid profile", root.profile);
        ApiError::bad_request("Invalid root user profile configured")
    })?;

    let status = UserStatus::parse(&root.status).ok_or_else(|| {
        tracing::error!("Root user status {:?} is not a valid status", root.status);
        ApiError::bad_request("Invalid root user status configured")
    })?;

    if root.email.trim().is_empty() || root.password.is_empty() {
        tracing::error!("Root user email or password is not configured");
        return Err(ApiError::bad_request(
            "Root user email and password must be configured",
        ));
    }

    let users = UserRepository::new().await?;

    if users.get_user_by_email(&root.email).await?.is_some() {
        tracing::debug!("Root user {} already present", root.email);
        return Ok(false);
    }

    let password_hash = password::hash_password(&root.password).await?;

    let id = users
        .add_user(&root.full_name, &root.email, &password_hash, profile, None, status)
        .await?;

    tracing::info!("Root user {} created with id {}", root.email, id);
    Ok(true)
}
