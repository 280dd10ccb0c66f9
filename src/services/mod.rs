// src/services/mod.rs

pub mod catalog;
pub mod credentials;
pub mod scoring;
pub mod submissions;
