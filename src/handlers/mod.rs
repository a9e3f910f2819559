// src/handlers/mod.rs

pub mod admin;
pub mod attempts;
pub mod auth;
pub mod billing;
pub mod exams;
pub mod profile;
