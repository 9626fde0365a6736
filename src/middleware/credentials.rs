use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::authz;
use crate::config;
use crate::database::health_unit_repository::HealthUnitRepository;
use crate::database::models::user::Profile;
use crate::error::ApiError;

/// Authenticated caller identity attached to admitted requests.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

impl std::ops::Deref for AuthUser {
    type Target = Claims;

    fn deref(&self) -> &Claims {
        &self.0
    }
}

/// Paths admitted with an API key alone, no identity token.
const PUBLIC_PATHS: &[&str] = &[
    "/api/health",
    "/api/users/login",
    "/api/ensure-root",
    "/api/docs",
    "/api/openapi.json",
];

/// Coarse role requirements derived from the route shape alone.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteRules {
    pub admin_only: bool,
    pub professional_only: bool,
    /// Set when the route addresses one health unit by id; its owner must be
    /// resolved and checked before admission.
    pub health_unit_id: Option<String>,
}

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path.starts_with(public))
}

/// Classify a request against the three route-pattern sets: admin-only,
/// professional-only and health-unit-scoped. Pure function of method + path.
pub fn classify_route(method: &Method, path: &str) -> RouteRules {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut rules = RouteRules::default();

    match segments.as_slice() {
        ["api", "users"] if method == Method::POST => rules.admin_only = true,
        ["api", "users", "administrators", "list"] => rules.admin_only = true,
        ["api", "users", _id] if method == Method::DELETE => rules.admin_only = true,
        ["api", "attendances"] if method == Method::POST => rules.professional_only = true,
        ["api", "attendances", "statistics", "summary"] => rules.admin_only = true,
        ["api", "health-units"] if method == Method::POST => rules.admin_only = true,
        ["api", "health-units", id] => {
            rules.health_unit_id = Some(id.to_string());
            if method == Method::PUT || method == Method::DELETE {
                rules.admin_only = true;
            }
        }
        _ => {}
    }

    rules
}

/// Per-request gatekeeper. Validates the static API key on every request,
/// admits public paths, then verifies the bearer token, enforces the route's
/// coarse role requirements and the health-unit ownership rule, and attaches
/// the decoded claims for downstream use.
pub async fn credentials_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    verify_api_key(request.headers())?;

    let path = request.uri().path().to_string();
    if is_public_path(&path) {
        return Ok(next.run(request).await);
    }

    let token = extract_bearer_token(request.headers())?;
    let claims = auth::verify_token(&token).map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        ApiError::from(e)
    })?;

    let rules = classify_route(request.method(), &path);

    if rules.admin_only && claims.profile != Profile::Administrator {
        tracing::warn!(
            "User {} tried to access admin route {} without admin privileges",
            claims.user_id,
            path
        );
        return Err(ApiError::forbidden(
            "Unauthorized. This request can only be made by administrators.",
        ));
    }

    if rules.professional_only && claims.profile != Profile::Professional {
        tracing::warn!(
            "User {} tried to access professional route {} without appropriate privileges",
            claims.user_id,
            path
        );
        return Err(ApiError::forbidden(
            "Unauthorized. This request can only be made by healthcare professionals.",
        ));
    }

    if let Some(unit_id) = &rules.health_unit_id {
        verify_health_unit_access(&claims, unit_id).await?;
    }

    request.extensions_mut().insert(AuthUser(claims));
    Ok(next.run(request).await)
}

fn verify_api_key(headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers.get("api_key").and_then(|v| v.to_str().ok());

    let Some(provided) = provided else {
        tracing::warn!("API Key missing in request");
        return Err(ApiError::bad_request("API Key is required"));
    };

    if provided != config::config().security.api_key {
        tracing::warn!("Invalid API Key provided");
        return Err(ApiError::forbidden("Invalid API Key"));
    }

    Ok(())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| {
            tracing::warn!("Token missing in request");
            ApiError::unauthorized("Authorization token is required")
        })?;

    let value = header.to_str().map_err(|_| {
        tracing::warn!("Invalid Authorization header encoding");
        ApiError::unauthorized("Invalid Authorization header format. Use 'Bearer <token>'")
    })?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => {
            tracing::warn!("Invalid Authorization header format");
            Err(ApiError::unauthorized(
                "Invalid Authorization header format. Use 'Bearer <token>'",
            ))
        }
    }
}

/// Route-shape enforcement for routes addressing one health unit: resolve
/// the unit's owner and apply the ownership predicate before admission.
/// An unknown or malformed unit id falls through so the use-case can answer
/// with its regular not-found shape.
async fn verify_health_unit_access(claims: &Claims, unit_id: &str) -> Result<(), ApiError> {
    let Ok(unit_id) = Uuid::parse_str(unit_id) else {
        return Ok(());
    };

    let repository = HealthUnitRepository::new().await?;
    match repository.admin_of_unit(unit_id).await? {
        Some(owner) if !authz::can_access_health_unit(claims, owner) => {
            tracing::warn!(
                "User {} denied access to health unit {} owned by {}",
                claims.user_id,
                unit_id,
                owner
            );
            Err(ApiError::forbidden(
                "Health unit belongs to a different administrator",
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_cover_health_login_and_docs() {
        assert!(is_public_path("/api/health"));
        assert!(is_public_path("/api/users/login"));
        assert!(is_public_path("/api/docs"));
        assert!(is_public_path("/api/openapi.json"));
        assert!(is_public_path("/api/ensure-root"));
        assert!(!is_public_path("/api/users"));
        assert!(!is_public_path("/api/attendances"));
    }

    #[test]
    fn create_user_is_admin_only() {
        let rules = classify_route(&Method::POST, "/api/users");
        assert!(rules.admin_only);
        assert!(!rules.professional_only);
    }

    #[test]
    fn list_and_get_users_are_open_to_both_roles() {
        assert_eq!(
            classify_route(&Method::GET, "/api/users"),
            RouteRules::default()
        );
        let id = Uuid::new_v4().to_string();
        assert_eq!(
            classify_route(&Method::GET, &format!("/api/users/{}", id)),
            RouteRules::default()
        );
    }

    #[test]
    fn delete_user_is_admin_only() {
        let id = Uuid::new_v4().to_string();
        let rules = classify_route(&Method::DELETE, &format!("/api/users/{}", id));
        assert!(rules.admin_only);
    }

    #[test]
    fn administrators_list_is_admin_only() {
        let rules = classify_route(&Method::GET, "/api/users/administrators/list");
        assert!(rules.admin_only);
    }

    #[test]
    fn create_attendance_is_professional_only() {
        let rules = classify_route(&Method::POST, "/api/attendances");
        assert!(rules.professional_only);
        assert!(!rules.admin_only);
    }

    #[test]
    fn statistics_summary_is_admin_only() {
        let rules = classify_route(&Method::GET, "/api/attendances/statistics/summary");
        assert!(rules.admin_only);
    }

    #[test]
    fn health_unit_routes_are_unit_scoped() {
        let id = Uuid::new_v4().to_string();
        let path = format!("/api/health-units/{}", id);

        let get = classify_route(&Method::GET, &path);
        assert_eq!(get.health_unit_id.as_deref(), Some(id.as_str()));
        assert!(!get.admin_only);

        let put = classify_route(&Method::PUT, &path);
        assert_eq!(put.health_unit_id.as_deref(), Some(id.as_str()));
        assert!(put.admin_only);

        let delete = classify_route(&Method::DELETE, &path);
        assert!(delete.admin_only);
    }

    #[test]
    fn create_health_unit_is_admin_only_but_not_unit_scoped() {
        let rules = classify_route(&Method::POST, "/api/health-units");
        assert!(rules.admin_only);
        assert!(rules.health_unit_id.is_none());
    }

    #[test]
    fn unclassified_routes_carry_no_requirements() {
        assert_eq!(
            classify_route(&Method::GET, "/api/attendances"),
            RouteRules::default()
        );
        assert_eq!(
            classify_route(&Method::PUT, "/api/attendances/some-id"),
            RouteRules::default()
        );
    }
}
