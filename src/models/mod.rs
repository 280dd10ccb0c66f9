// src/models/mod.rs

pub mod exam_submission;
pub mod pagination;
pub mod question;
pub mod user;
