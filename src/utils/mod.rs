// src/utils/mod.rs

pub mod extract;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod mailer;
pub mod otp;
pub mod rate_limit;
