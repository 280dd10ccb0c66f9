// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::{AUTH_COOKIE_MAX_AGE_SECONDS, Config},
    error::AppError,
    models::user::{Role, User},
    state::AppState,
};

/// Name of the HTTP-only cookie carrying the access token.
pub const AUTH_COOKIE: &str = "accessToken";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Value,
    #[serde(default)]
    pub email_verified: bool,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(user: &User, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        permissions: user.permissions.0.clone(),
        email_verified: user.email_verified,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Builds the access cookie for a freshly signed token.
pub fn auth_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(AUTH_COOKIE_MAX_AGE_SECONDS))
        .build()
}

/// Cookie used to clear the access token on logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, "")).path("/").build()
}

/// Axum Middleware: Authentication.
///
/// Reads the token from the `accessToken` cookie, falling back to an
/// 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
pub async fn auth_middleware(
    State(config): State<Config>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = match jar.get(AUTH_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?,
    };

    let claims = verify_jwt(&token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Fine-grained authorization for roles without the admin bypass.
///
/// `resource` is the API area being accessed, e.g. `exam-result`.
pub trait PermissionCheck: Send + Sync {
    fn grants(&self, claims: &Claims, resource: &str) -> bool;
}

/// No fine-grained rules exist yet, so every non-admin request is refused.
pub struct DenyByDefault;

impl PermissionCheck for DenyByDefault {
    fn grants(&self, _claims: &Claims, _resource: &str) -> bool {
        false
    }
}

/// First path segment below `/api`, taken from the un-nested URI.
fn resource_of(req: &Request<Body>) -> String {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path())
        .unwrap_or_else(|| req.uri().path());

    path.trim_start_matches('/')
        .trim_start_matches("api/")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Axum Middleware: Authorization.
///
/// Must be used AFTER `auth_middleware`. Admin roles pass; everyone else is
/// subject to the configured `PermissionCheck`.
pub async fn permission_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let allowed = {
        let claims = req
            .extensions()
            .get::<Claims>()
            .ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?;

        claims.role.is_admin() || state.permissions.grants(claims, &resource_of(&req))
    };

    if !allowed {
        return Err(AppError::Forbidden("Permission denied".to_string()));
    }

    Ok(next.run(req).await)
}
