// src/models/user.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ExamTaker,
    Superadmin,
}

impl Role {
    /// Admins and superadmins bypass every permission check.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Blocked,
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Unique login email.
    pub email: String,
    /// Argon2 password hash.
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
    /// Free-form permission map. Only consulted through `PermissionCheck`.
    pub permissions: Json<Value>,
    pub user_details: Json<Value>,
    pub email_verified: bool,
    /// SHA-256 hex of the pending email OTP.
    pub otp_hash: Option<String>,
    pub otp_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    /// SHA-256 hex of the pending password reset token.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Column list matching `User`, for `SELECT`/`RETURNING` clauses.
pub const USER_COLUMNS: &str = "id, name, email, password, role, status, permissions, user_details, \
     email_verified, otp_hash, otp_expires_at, reset_token_hash, reset_token_expires_at, created_at";

/// User as returned to clients. Never carries hashes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub permissions: Value,
    pub user_details: Value,
    pub email_verified: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            status: user.status,
            permissions: user.permissions.0,
            user_details: user.user_details.0,
            email_verified: user.email_verified,
        }
    }
}

/// `{id, name, email}` projection embedded in groups and submissions.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name, email, and password are required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Name, email, and password are required"))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 254, message = "Email and password are required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Email and password are required"))]
    pub password: String,
}

/// DTO carrying only an email (send-otp, forgot-password).
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 254, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 254, message = "Email and OTP are required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 16, message = "Email and OTP are required"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Token and password required"))]
    pub token: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Token and password required"))]
    pub new_password: String,
}
