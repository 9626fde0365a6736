//! Password hashing collaborator.
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool
//! to keep request-handling threads free.

use crate::error::ApiError;

pub async fn hash_password(plaintext: &str) -> Result<String, ApiError> {
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| {
            tracing::error!("Password hashing task failed: {}", e);
            ApiError::internal_server_error("Password processing failed")
        })?
        .map_err(ApiError::from)
}

pub async fn verify_password(plaintext: &str, hash: &str) -> Result<bool, ApiError> {
    let plaintext = plaintext.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            ApiError::internal_server_error("Password processing failed")
        })?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("s3cret").await.unwrap();
        assert_ne!(hash, "s3cret");
        assert!(verify_password("s3cret", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }
}
