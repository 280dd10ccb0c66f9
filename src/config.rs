// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

/// Lifetime of an emailed OTP code, in seconds.
pub const OTP_TTL_SECONDS: i64 = 10 * 60;

/// Lifetime of a password reset token, in seconds.
pub const RESET_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// Max-age of the access token cookie, in seconds.
pub const AUTH_COOKIE_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Base URL of the web client; used for CORS and reset links.
    pub frontend_url: String,
    /// Whether the access cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
    pub mail_from: String,
    /// When unset, outgoing mail is written to the log instead.
    pub mail_webhook_url: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u32,
    /// Key the rate limiter on `X-Forwarded-For`. Only enable behind a proxy that overwrites it.
    pub trust_proxy: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Exam System <no-reply@localhost>".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 24 * 60 * 60),
            rust_log,
            port: parse_or("PORT", 3000),
            frontend_url,
            cookie_secure: parse_or("COOKIE_SECURE", false),
            mail_from,
            mail_webhook_url: env::var("MAIL_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 10),
            rate_limit_max_requests: parse_or("RATE_LIMIT_MAX_REQUESTS", 30),
            trust_proxy: parse_or("TRUST_PROXY", false),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}

/// Reads an optional variable, falling back to `default` when it is unset or unparsable.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
