// src/types/records.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One digest send attempt to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailLogEntry {
    pub id: i64,
    pub sent_date: DateTime<Utc>,
    pub recipient: String,
    pub job_count: i64,
    pub subject: String,
    pub success: bool,
}

/// One pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchRunEntry {
    pub id: i64,
    pub run_date: DateTime<Utc>,
    pub jobs_found: i64,
    pub jobs_validated: i64,
    pub jobs_new: i64,
    pub duration_seconds: f64,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_jobs: i64,
    pub sent_jobs: i64,
    pub unsent_jobs: i64,
    pub total_emails: i64,
    pub last_run: Option<SearchRunEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub new: bool,
}
