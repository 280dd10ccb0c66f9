// src/handlers/mod.rs

pub mod auth;
pub mod exam_submission;
pub mod question;
pub mod question_group;
