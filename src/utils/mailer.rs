// src/utils/mailer.rs

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::{config::Config, error::AppError};

/// An outgoing HTML email.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivery transport for notification emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), AppError>;
}

/// Writes emails to the log. Used when no transport is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Mail transport not configured, email body:\n{}", email.html);
        Ok(())
    }
}

/// Posts each email as JSON to an HTTP relay.
pub struct WebhookMailer {
    client: reqwest::Client,
    endpoint: Url,
}

impl WebhookMailer {
    pub fn new(endpoint: &str) -> Result<Self, AppError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::InternalServerError(format!("Invalid MAIL_WEBHOOK_URL: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        self.client
            .post(self.endpoint.clone())
            .json(&email)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::InternalServerError(format!("Failed to send email: {}", e)))?;

        tracing::debug!(to = %email.to, "Email handed to relay");
        Ok(())
    }
}

/// Builds the mailer described by the configuration.
pub fn mailer_from_config(config: &Config) -> Result<Box<dyn Mailer>, AppError> {
    match &config.mail_webhook_url {
        Some(endpoint) => Ok(Box::new(WebhookMailer::new(endpoint)?)),
        None => Ok(Box::new(LogMailer)),
    }
}

pub fn otp_email(config: &Config, to: &str, otp: &str) -> Email {
    Email {
        from: config.mail_from.clone(),
        to: to.to_string(),
        subject: "Your Email Verification OTP".to_string(),
        html: format!(
            "<p>Your OTP is:</p>\n<h2>{}</h2>\n<p>This OTP is valid for 10 minutes.</p>",
            otp
        ),
    }
}

pub fn password_reset_email(config: &Config, to: &str, name: &str, reset_url: &str) -> Email {
    Email {
        from: config.mail_from.clone(),
        to: to.to_string(),
        subject: "Password Reset Verification".to_string(),
        html: format!(
            "<p>Hello {name},</p>\n\
             <p>You requested a password reset.</p>\n\
             <p>Click the link below to reset your password:</p>\n\
             <a href=\"{url}\">{url}</a>\n\
             <p>This link expires in 15 minutes.</p>\n\
             <p>If you did not request this, ignore this email.</p>",
            name = ammonia::clean_text(name),
            url = reset_url,
        ),
    }
}

/// Joins `/reset-password/{token}` onto the frontend base URL.
pub fn reset_link(frontend_url: &str, token: &str) -> Result<String, AppError> {
    let mut url = Url::parse(frontend_url)
        .map_err(|e| AppError::InternalServerError(format!("Invalid FRONTEND_URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::InternalServerError("FRONTEND_URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["reset-password", token]);
    Ok(url.to_string())
}
