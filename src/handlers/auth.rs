// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{Config, OTP_TTL_SECONDS, RESET_TOKEN_TTL_SECONDS},
    error::AppError,
    models::user::{
        EmailRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, Role, UserResponse,
        UserStatus, VerifyOtpRequest,
    },
    services::credentials::{self, NewUser},
    utils::{
        extract::AppJson,
        hash::{digests_match, sha256_hex, verify_password},
        jwt::{Claims, auth_cookie, removal_cookie, sign_jwt},
        mailer::{Mailer, otp_email, password_reset_email, reset_link},
        otp::{generate_otp, generate_reset_token},
    },
};

const FORGOT_PASSWORD_MESSAGE: &str = "If this email exists, a reset link has been sent";
const INVALID_RESET_TOKEN: &str = "Invalid or expired token";

/// Registers a new exam taker and signs them in.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created, the user object and the access cookie.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    jar: CookieJar,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = credentials::create_user(
        &pool,
        NewUser {
            name: &payload.name,
            email: &payload.email,
            password: &payload.password,
            role: Role::ExamTaker,
            email_verified: false,
        },
    )
    .await?;

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        jar.add(auth_cookie(token, &config)),
        Json(json!({
            "message": "Registration successful",
            "user": UserResponse::from(user),
        })),
    ))
}

/// Authenticates a user and sets the access cookie.
///
/// Only `active` accounts may sign in.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = credentials::find_by_email(&pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.status != UserStatus::Active {
        return Err(AppError::Forbidden("User account is inactive".to_string()));
    }

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        jar.add(auth_cookie(token, &config)),
        Json(json!({
            "message": "Login successful",
            "user": UserResponse::from(user),
        })),
    ))
}

/// Clears the access cookie. The token itself stays valid until it expires.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(removal_cookie()),
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// Starts a password reset.
///
/// The response never reveals whether the email is registered.
pub async fn forgot_password(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    AppJson(payload): AppJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(user) = credentials::find_by_email(&pool, &payload.email).await? {
        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECONDS);
        credentials::store_reset_token(&pool, user.id, &sha256_hex(&token), expires_at).await?;

        let url = reset_link(&config.frontend_url, &token)?;
        let email = password_reset_email(&config, &user.email, &user.name, &url);
        if let Err(e) = mailer.send(email).await {
            // The response must not depend on delivery.
            tracing::error!(user_id = user.id, "Failed to send password reset email: {}", e);
        }
    }

    Ok(Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })))
}

/// Completes a password reset with a token from the reset email. Tokens are single use.
pub async fn reset_password(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let token_hash = sha256_hex(&payload.token);
    let user = credentials::find_by_reset_token(&pool, &token_hash)
        .await?
        .filter(|user| user.reset_token_expires_at.is_some_and(|exp| exp > Utc::now()))
        .ok_or_else(|| AppError::BadRequest(INVALID_RESET_TOKEN.to_string()))?;

    if !credentials::reset_password(&pool, user.id, &token_hash, &payload.new_password).await? {
        return Err(AppError::BadRequest(INVALID_RESET_TOKEN.to_string()));
    }

    tracing::info!(user_id = user.id, "Password reset");
    Ok(Json(json!({ "message": "Password reset successful" })))
}

/// Emails a fresh six-digit verification code, valid for ten minutes.
pub async fn send_email_otp(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    AppJson(payload): AppJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = credentials::find_by_email(&pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let otp = generate_otp();
    let expires_at = Utc::now() + Duration::seconds(OTP_TTL_SECONDS);
    credentials::store_otp(&pool, user.id, &sha256_hex(&otp), expires_at).await?;

    mailer.send(otp_email(&config, &user.email, &otp)).await?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent to registered email",
    })))
}

/// Verifies the emailed code and marks the address verified.
///
/// Exam takers may only verify their own address.
pub async fn verify_email_otp(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let not_requested = || AppError::BadRequest("OTP not requested".to_string());

    let user = credentials::find_by_email(&pool, &payload.email)
        .await?
        .ok_or_else(not_requested)?;

    if user.id != claims.user_id()? && !claims.role.is_admin() {
        return Err(AppError::Forbidden("Permission denied".to_string()));
    }

    let (stored_hash, expires_at) = match (&user.otp_hash, user.otp_expires_at) {
        (Some(hash), Some(expires_at)) => (hash.clone(), expires_at),
        _ => return Err(not_requested()),
    };

    if expires_at < Utc::now() {
        return Err(AppError::BadRequest("OTP expired".to_string()));
    }

    if !digests_match(&sha256_hex(payload.otp.trim()), &stored_hash) {
        return Err(AppError::AuthError("Invalid OTP".to_string()));
    }

    if !credentials::consume_otp(&pool, user.id, &stored_hash).await? {
        return Err(not_requested());
    }

    tracing::info!(user_id = user.id, "Email verified");
    Ok(Json(json!({
        "success": true,
        "message": "Email verified successfully",
    })))
}
