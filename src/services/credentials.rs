// src/services/credentials.rs

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{SqlitePool, types::Json};

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{Role, USER_COLUMNS, User, UserStatus},
    utils::hash::hash_password,
};

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("User lookup failed: {:?}", e);
            AppError::from(e)
        })?;
    Ok(user)
}

/// Fields of a user to be created. The password is hashed on write.
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub email_verified: bool,
}

pub async fn create_user(pool: &SqlitePool, new_user: NewUser<'_>) -> Result<User, AppError> {
    let email = normalize_email(new_user.email);
    let hashed_password = hash_password(new_user.password)?;

    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password, role, status, permissions, user_details, email_verified, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.name.trim())
    .bind(&email)
    .bind(hashed_password)
    .bind(new_user.role)
    .bind(UserStatus::Active)
    .bind(Json(json!({})))
    .bind(Json(json!({})))
    .bind(new_user.email_verified)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("User with this email already exists".to_string())
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::from(e)
        }
    })
}

/// Stores a pending OTP hash, replacing any earlier one.
pub async fn store_otp(
    pool: &SqlitePool,
    user_id: i64,
    otp_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET otp_hash = ?, otp_expires_at = ? WHERE id = ?")
        .bind(otp_hash)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks the email verified and consumes the OTP.
///
/// Only succeeds while `otp_hash` still holds the verified hash, so a code can be spent once.
pub async fn consume_otp(pool: &SqlitePool, user_id: i64, otp_hash: &str) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE users
         SET email_verified = TRUE, otp_hash = NULL, otp_expires_at = NULL
         WHERE id = ? AND otp_hash = ?",
    )
    .bind(user_id)
    .bind(otp_hash)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn store_reset_token(
    pool: &SqlitePool,
    user_id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET reset_token_hash = ?, reset_token_expires_at = ? WHERE id = ?")
        .bind(token_hash)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_by_reset_token(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE reset_token_hash = ?"
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Replaces the password and clears the reset token it was authorised by.
///
/// Returns false when the token was already spent by a concurrent reset.
pub async fn reset_password(
    pool: &SqlitePool,
    user_id: i64,
    token_hash: &str,
    new_password: &str,
) -> Result<bool, AppError> {
    let hashed_password = hash_password(new_password)?;
    let result = sqlx::query(
        "UPDATE users
         SET password = ?, reset_token_hash = NULL, reset_token_expires_at = NULL
         WHERE id = ? AND reset_token_hash = ?",
    )
    .bind(hashed_password)
    .bind(user_id)
    .bind(token_hash)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Creates the configured admin account if no user holds that email yet.
pub async fn seed_admin(pool: &SqlitePool, email: &str, password: &str) -> Result<(), AppError> {
    if find_by_email(pool, email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    create_user(
        pool,
        NewUser {
            name: "Admin User",
            email,
            password,
            role: Role::Admin,
            email_verified: true,
        },
    )
    .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}
