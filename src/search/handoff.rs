// src/search/handoff.rs
//! Directory-based exchange with the external search agent.
//!
//! The pipeline writes the queries and a pending ticket, the agent writes
//! its results next to them, and the next run picks them up under the same
//! run id.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use super::extract::HandoffRecord;
use crate::core::FsOps;

pub const QUERIES_FILE: &str = "search_queries.json";
pub const RESULTS_FILE: &str = "raw_jobs.json";
pub const TICKET_FILE: &str = "pending_run.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffTicket {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub query_count: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsFile {
    List(Vec<HandoffRecord>),
    Wrapped { jobs: Vec<HandoffRecord> },
}

pub struct SearchHandoff {
    dir: PathBuf,
}

impl SearchHandoff {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn queries_path(&self) -> PathBuf {
        self.dir.join(QUERIES_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }

    fn ticket_path(&self) -> PathBuf {
        self.dir.join(TICKET_FILE)
    }

    /// Start a run, or re-enter the pending one. The query file is always
    /// rewritten so the agent sees the current configuration.
    pub async fn begin(&self, queries: &[String]) -> Result<HandoffTicket> {
        FsOps::ensure_dir_exists(&self.dir).await?;
        FsOps::write_json(&self.queries_path(), queries).await?;

        if let Some(mut ticket) = self.pending().await? {
            info!("Resuming pending run {}", ticket.run_id);
            if ticket.query_count != queries.len() {
                ticket.query_count = queries.len();
                FsOps::write_json(&self.ticket_path(), &ticket).await?;
            }
            return Ok(ticket);
        }

        let ticket = HandoffTicket {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            query_count: queries.len(),
        };
        FsOps::write_json(&self.ticket_path(), &ticket).await?;

        info!(
            "Started run {} with {} queries in {}",
            ticket.run_id,
            ticket.query_count,
            self.queries_path().display()
        );
        Ok(ticket)
    }

    /// The ticket of the run waiting on results, if any
    pub async fn pending(&self) -> Result<Option<HandoffTicket>> {
        let path = self.ticket_path();
        if !path.exists() {
            return Ok(None);
        }

        match FsOps::read_json::<HandoffTicket>(&path).await {
            Ok(ticket) => Ok(Some(ticket)),
            Err(e) => {
                warn!("Discarding unreadable run ticket: {:#}", e);
                FsOps::remove_file_if_exists(&path).await?;
                Ok(None)
            }
        }
    }

    /// Results written by the agent, or `None` while the run is still pending
    pub async fn collect(&self, ticket: &HandoffTicket) -> Result<Option<Vec<HandoffRecord>>> {
        let path = self.results_path();
        if !path.exists() {
            info!("Run {} is waiting for search results", ticket.run_id);
            return Ok(None);
        }

        let records = match FsOps::read_json::<ResultsFile>(&path)
            .await
            .with_context(|| format!("Search results for run {} are malformed", ticket.run_id))?
        {
            ResultsFile::List(records) => records,
            ResultsFile::Wrapped { jobs } => jobs,
        };

        info!("Collected {} records for run {}", records.len(), ticket.run_id);
        Ok(Some(records))
    }

    /// Archive the consumed results and clear the ticket
    pub async fn complete(&self, ticket: &HandoffTicket) -> Result<PathBuf> {
        let archived = self.dir.join(format!("raw_jobs.{}.json", ticket.run_id));
        FsOps::rename(&self.results_path(), &archived).await?;
        FsOps::remove_file_if_exists(&self.ticket_path()).await?;

        info!("Archived results of run {} to {}", ticket.run_id, archived.display());
        Ok(archived)
    }
}
