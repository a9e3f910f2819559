// src/models/mod.rs

pub mod account;
pub mod attempt;
pub mod exam;
pub mod question;
pub mod subscription;
