use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::user::Profile;

/// Identity claims carried inside a signed token.
///
/// Self-contained so every downstream check (role, tenancy) is computable
/// without a database round-trip. An administrator claim never carries
/// `admin_id`; a professional claim always carries exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub profile: Profile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token generation failed: {0}")]
    Generation(String),

    #[error("signing secret not configured")]
    MissingSecret,
}

/// Issue a signed, time-bound identity token. Pure function of its inputs,
/// the signing secret and the current time.
pub fn issue_token(
    user_id: Uuid,
    full_name: &str,
    email: &str,
    profile: Profile,
    admin_id: Option<Uuid>,
) -> Result<String, TokenError> {
    issue_token_with_ttl(
        user_id,
        full_name,
        email,
        profile,
        admin_id,
        config::config().security.token_ttl_secs,
    )
}

pub fn issue_token_with_ttl(
    user_id: Uuid,
    full_name: &str,
    email: &str,
    profile: Profile,
    admin_id: Option<Uuid>,
    ttl_secs: i64,
) -> Result<String, TokenError> {
    let secret = &config::config().security.secret_key;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let now = Utc::now();
    let claims = Claims {
        user_id,
        full_name: full_name.to_string(),
        email: email.to_string(),
        profile,
        admin_id,
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify and decode a token. All-or-nothing: any structural or
/// cryptographic failure yields an error, never partial claims.
pub fn verify_token(token: &str) -> Result<Claims, TokenError> {
    let secret = &config::config().security.secret_key;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let mut validation = Validation::default();
    // Expiry is exact; the default 60s leeway would keep dead tokens alive.
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        other => TokenError::Malformed(format!("{:?}", other)),
    })?;

    Ok(token_data.claims)
}
