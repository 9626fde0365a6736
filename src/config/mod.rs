use once_cell::sync::Lazy;
use std::env;

/// Process-wide configuration, loaded once at startup from the environment
/// and never mutated afterwards. Components receive values from here rather
/// than reading the environment themselves.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub security: SecurityConfig,
    pub root_user: RootUserConfig,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// HS256 signing secret for identity tokens
    pub secret_key: String,
    /// Static API key required on every request
    pub api_key: String,
    /// Identity token validity window in seconds
    pub token_ttl_secs: i64,
}

/// Root administrator created by the bootstrap endpoint when absent.
#[derive(Debug, Clone)]
pub struct RootUserConfig {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub profile: String,
    pub status: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            security: SecurityConfig {
                secret_key: env::var("SECRET_KEY")
                    .unwrap_or_else(|_| "dev-secret-change-me".to_string()),
                api_key: env::var("API_KEY").unwrap_or_else(|_| "dev-api-key".to_string()),
                token_ttl_secs: env::var("TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8 * 3600),
            },
            root_user: RootUserConfig {
                full_name: env::var("USER_NAME_ROOT").unwrap_or_else(|_| "Root Admin".to_string()),
                email: env::var("USER_EMAIL_ROOT")
                    .unwrap_or_else(|_| "root@localhost".to_string()),
                password: env::var("USER_ROOT_PASSWORD")
                    .unwrap_or_else(|_| "change-me".to_string()),
                profile: env::var("USER_ROOT_PROFILE")
                    .unwrap_or_else(|_| "administrator".to_string()),
                status: env::var("USER_STATUS_ROOT").unwrap_or_else(|_| "active".to_string()),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = AppConfig::from_env();
        assert!(!config.security.secret_key.is_empty());
        assert!(!config.security.api_key.is_empty());
        assert!(config.security.token_ttl_secs > 0);
        assert_eq!(config.root_user.status, "active");
    }
}
