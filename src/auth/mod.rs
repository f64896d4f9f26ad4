//! JWT bearer authentication and password hashing.
//!
//! Access tokens are short-lived HS256 JWTs carrying the user id as the
//! subject claim; refresh tokens are opaque server-side values handled by
//! the repository. The owner id used by every store operation comes from a
//! validated access token, never from request data.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, ErrorResponse};

/// The authenticated caller, injected into request extensions by the
/// bearer middleware.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: i64,
}

/// JWT claims for access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_token_ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: String, access_token_ttl_secs: i64) -> Self {
        Self {
            secret,
            access_token_ttl_secs,
        }
    }

    /// Generate a signed access token for a user.
    pub fn generate_access_token(&self, user_id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_ttl_secs)).timestamp(),
            token_type: "access".to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("Token creation failed: {}", e);
            AppError::Internal("Failed to issue token".to_string())
        })
    }

    /// Validate an access token and return the caller it identifies.
    pub fn validate_access_token(&self, token: &str) -> Result<CurrentUser, AppError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        if data.claims.token_type != "access" {
            return Err(AppError::Unauthorized("Not an access token".to_string()));
        }

        let id = data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Malformed subject claim".to_string()))?;

        Ok(CurrentUser { id })
    }
}

/// Explicit ownership check: may `caller_id` act on a resource owned by
/// `owner_id`?
pub fn can_access(caller_id: i64, owner_id: i64) -> bool {
    caller_id == owner_id
}

/// Hash a password with Argon2 and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AppError::Internal("Failed to hash password".to_string())
        })
}

/// Verify a password against a stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Bearer authentication layer function that takes the token service as a
/// parameter.
pub async fn bearer_auth_layer(tokens: TokenService, mut request: Request, next: Next) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let Some(token) = bearer else {
        return unauthorized_response("Missing bearer token");
    };

    match tokens.validate_access_token(&token) {
        Ok(current_user) => {
            request.extensions_mut().insert(current_user);
            next.run(request).await
        }
        Err(err) => unauthorized_response(&err.message()),
    }
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(&AppError::Unauthorized(message.to_string()));
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
