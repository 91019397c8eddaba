// src/validation/mod.rs
//! Liveness checks for posting pages

pub mod types;
pub mod validator;

pub use types::ValidationResult;
pub use validator::JobValidator;
