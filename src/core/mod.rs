// src/core/mod.rs
//! Configuration, persistence, filesystem and mail plumbing shared by the pipeline

pub mod config_manager;
pub mod database;
pub mod fs_ops;
pub mod mail_client;

pub use config_manager::{AppConfig, ConfigManager};
pub use database::JobStore;
pub use fs_ops::FsOps;
pub use mail_client::{AgentMailClient, Mailer, OutboundMessage};
