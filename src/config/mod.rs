//! Configuration module for the lineup backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default secret used when LINEUP_JWT_SECRET is absent. Development only.
const DEV_JWT_SECRET: &str = "dev-only-insecure-secret";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret for signing access tokens (required in production)
    pub jwt_secret: String,
    /// True when the secret fell back to the development default
    pub jwt_secret_is_default: bool,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let (jwt_secret, jwt_secret_is_default) = match env::var("LINEUP_JWT_SECRET") {
            Ok(secret) => (secret, false),
            Err(_) => (DEV_JWT_SECRET.to_string(), true),
        };

        let access_token_ttl_secs = env::var("LINEUP_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(900);

        let refresh_token_ttl_secs = env::var("LINEUP_REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7 * 24 * 3600);

        let db_path = env::var("LINEUP_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let bind_addr = env::var("LINEUP_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid LINEUP_BIND_ADDR format");

        let log_level = env::var("LINEUP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            jwt_secret,
            jwt_secret_is_default,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            db_path,
            bind_addr,
            log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("LINEUP_JWT_SECRET");
        env::remove_var("LINEUP_ACCESS_TOKEN_TTL_SECS");
        env::remove_var("LINEUP_REFRESH_TOKEN_TTL_SECS");
        env::remove_var("LINEUP_DB_PATH");
        env::remove_var("LINEUP_BIND_ADDR");
        env::remove_var("LINEUP_LOG_LEVEL");

        let config = Config::from_env();

        assert!(config.jwt_secret_is_default);
        assert_eq!(config.access_token_ttl_secs, 900);
        assert_eq!(config.refresh_token_ttl_secs, 7 * 24 * 3600);
        assert_eq!(config.db_path, PathBuf::from("./data/app.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
    }
}
