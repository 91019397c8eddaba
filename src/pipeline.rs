// src/pipeline.rs
//! The daily run: queries, agent handoff, scoring, validation, persistence,
//! digest, run log.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::{AppConfig, JobStore, Mailer};
use crate::digest::{DigestOutcome, DigestSender};
use crate::scoring::Scorer;
use crate::search::{compile_records, generate_queries, Extractor, HandoffTicket, SearchHandoff};
use crate::types::JobPosting;
use crate::validation::JobValidator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DigestStatus {
    /// No new jobs this run
    Skipped,
    /// New jobs were found but the store had nothing unsent
    NothingUnsent,
    Delivered(DigestOutcome),
    /// The sender itself failed before finishing
    Errored(String),
}

impl DigestStatus {
    pub fn is_success(&self) -> bool {
        match self {
            Self::Delivered(outcome) => outcome.is_success(),
            Self::Errored(_) => false,
            Self::Skipped | Self::NothingUnsent => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Option<Uuid>,
    pub jobs_found: usize,
    pub jobs_validated: usize,
    pub jobs_new: usize,
    pub digest: DigestStatus,
    pub duration: Duration,
    pub success: bool,
}

/// A run waiting on the search agent; re-running resumes it
#[derive(Debug, Clone, Serialize)]
pub struct PendingRun {
    pub run_id: Uuid,
    pub query_count: usize,
    pub queries_path: PathBuf,
    pub results_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    Pending(PendingRun),
    Completed(RunReport),
}

/// Search results the agent delivered for a run, compiled into candidates
pub struct CollectedRun {
    ticket: HandoffTicket,
    candidates: Vec<JobPosting>,
    started: Instant,
}

impl CollectedRun {
    pub fn run_id(&self) -> Uuid {
        self.ticket.run_id
    }

    pub fn candidates(&self) -> &[JobPosting] {
        &self.candidates
    }
}

pub enum RunStage {
    Pending(PendingRun),
    Ready(CollectedRun),
}

pub struct Pipeline<'a> {
    config: &'a AppConfig,
    store: &'a JobStore,
    validator: &'a JobValidator,
    handoff: &'a SearchHandoff,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a AppConfig,
        store: &'a JobStore,
        validator: &'a JobValidator,
        handoff: &'a SearchHandoff,
    ) -> Self {
        Self {
            config,
            store,
            validator,
            handoff,
        }
    }

    pub fn generate_queries(&self) -> Vec<String> {
        generate_queries(&self.config.search)
    }

    /// Run end to end, or stop at the handoff if the agent has not delivered yet
    pub async fn run(&self, mailer: &dyn Mailer) -> Result<RunOutcome> {
        match self.collect().await? {
            RunStage::Pending(pending) => Ok(RunOutcome::Pending(pending)),
            RunStage::Ready(collected) => {
                Ok(RunOutcome::Completed(self.finish(collected, mailer).await?))
            }
        }
    }

    /// Write the queries and pick up the agent's results if they are there
    pub async fn collect(&self) -> Result<RunStage> {
        let started = Instant::now();

        let queries = self.generate_queries();
        info!("Generated {} queries", queries.len());
        let ticket = self.handoff.begin(&queries).await?;

        let Some(records) = self.handoff.collect(&ticket).await? else {
            return Ok(RunStage::Pending(PendingRun {
                run_id: ticket.run_id,
                query_count: ticket.query_count,
                queries_path: self.handoff.queries_path(),
                results_path: self.handoff.results_path(),
            }));
        };

        let extractor = Extractor::new(&self.config.search)?;
        let candidates = compile_records(records, &extractor);

        Ok(RunStage::Ready(CollectedRun {
            ticket,
            candidates,
            started,
        }))
    }

    /// Process a collected run and archive its results. On error the results
    /// stay in the handoff directory for the next attempt.
    pub async fn finish(&self, collected: CollectedRun, mailer: &dyn Mailer) -> Result<RunReport> {
        let CollectedRun {
            ticket,
            candidates,
            started,
        } = collected;

        let report = self
            .process(Some(ticket.run_id), candidates, started, mailer)
            .await?;
        self.handoff.complete(&ticket).await?;
        Ok(report)
    }

    /// Score, validate, persist and notify for an already collected batch
    pub async fn process(
        &self,
        run_id: Option<Uuid>,
        candidates: Vec<JobPosting>,
        started: Instant,
        mailer: &dyn Mailer,
    ) -> Result<RunReport> {
        let jobs_found = candidates.len();

        let ranked = Scorer::new(self.config).rank(candidates);
        info!("Scored {} jobs", ranked.len());

        let valid = self
            .validator
            .validate_all(ranked, self.config.validation.delay())
            .await;
        let jobs_validated = valid.len();
        info!("{}/{} jobs validated", jobs_validated, jobs_found);

        let jobs_new = match self.persist(&valid).await {
            Ok(new) => new,
            Err(e) => {
                error!("Persisting jobs failed: {:#}", e);
                if let Err(log_err) = self
                    .store
                    .record_run(jobs_found, jobs_validated, 0, started.elapsed(), false)
                    .await
                {
                    error!("Could not record failed run: {:#}", log_err);
                }
                return Err(e);
            }
        };
        info!(
            "Added {} new jobs to database ({} already existed)",
            jobs_new,
            jobs_validated - jobs_new
        );

        let digest = if jobs_new > 0 {
            self.send_digest(mailer).await
        } else {
            info!("No new jobs found, skipping email");
            DigestStatus::Skipped
        };

        let success = digest.is_success();
        let duration = started.elapsed();
        self.store
            .record_run(jobs_found, jobs_validated, jobs_new, duration, success)
            .await?;

        Ok(RunReport {
            run_id,
            jobs_found,
            jobs_validated,
            jobs_new,
            digest,
            duration,
            success,
        })
    }

    async fn persist(&self, jobs: &[JobPosting]) -> Result<usize> {
        let mut new_count = 0;
        for job in jobs {
            if self.store.upsert(job).await?.new {
                new_count += 1;
            }
        }
        Ok(new_count)
    }

    async fn send_digest(&self, mailer: &dyn Mailer) -> DigestStatus {
        let unsent = match self.store.list_unsent(Some(self.config.email.top_count)).await {
            Ok(unsent) => unsent,
            Err(e) => return DigestStatus::Errored(format!("{:#}", e)),
        };

        if unsent.is_empty() {
            warn!("New jobs were stored but none are unsent");
            return DigestStatus::NothingUnsent;
        }

        let jobs: Vec<JobPosting> = unsent.iter().map(|j| j.posting()).collect();
        let sender = DigestSender::new(
            &self.config.email,
            self.store,
            self.validator,
            mailer,
            self.config.validation.delay(),
        );

        match sender.send(jobs).await {
            Ok(outcome) => {
                if outcome.is_success() {
                    info!("Digest delivered: {:?}", outcome);
                } else {
                    error!("Digest delivery failed: {:?}", outcome);
                }
                DigestStatus::Delivered(outcome)
            }
            Err(e) => {
                error!("Digest send aborted: {:#}", e);
                DigestStatus::Errored(format!("{:#}", e))
            }
        }
    }
}
