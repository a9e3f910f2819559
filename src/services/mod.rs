// src/services/mod.rs

pub mod accounts;
pub mod attempts;
pub mod billing;
pub mod catalog;
pub mod quota;
