//! Personal job search pipeline: generates search queries for an external
//! search agent, scores and validates the postings it finds, keeps them in
//! SQLite and emails a ranked digest of the new ones.

pub mod cli;
pub mod core;
pub mod digest;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod search;
pub mod types;
pub mod utils;
pub mod validation;
pub mod web;

pub use crate::core::{AppConfig, ConfigManager, JobStore};
pub use crate::error::{DeliveryError, ValidationError};
pub use crate::pipeline::{Pipeline, RunOutcome, RunReport};
