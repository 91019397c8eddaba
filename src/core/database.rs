// src/core/database.rs
//! SQLite-backed job store: the `jobs` table keyed by url plus the
//! append-only `email_log` and `search_runs` tables.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::FsOps;
use crate::types::{EmailLogEntry, JobPosting, SearchRunEntry, StoreStats, StoredJob, UpsertOutcome};

const JOB_COLUMNS: &str = "url, title, company, location, salary, score, source, \
                           first_seen, last_seen, sent, sent_date, raw_data";

#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Open (creating if needed) the database used by the pipeline.
    ///
    /// WAL journaling lets a reporting process read while a run writes.
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                FsOps::ensure_dir_exists(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to database: {}", database_path.display())
            })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open an existing database for reporting only
    pub async fn open_read_only(database_path: &Path) -> Result<Self> {
        if !database_path.exists() {
            anyhow::bail!(
                "Database not found: {}. Run `jobscout init` first.",
                database_path.display()
            );
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .read_only(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database read-only: {}",
                    database_path.display()
                )
            })?;

        info!("Read-only database handle: {}", database_path.display());
        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database URL")?;

        // Every connection to :memory: is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to create in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                salary TEXT,
                score INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL DEFAULT '',
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL,
                sent BOOLEAN NOT NULL DEFAULT FALSE,
                sent_date TEXT,
                raw_data TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS email_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sent_date TEXT NOT NULL,
                recipient TEXT NOT NULL,
                job_count INTEGER NOT NULL,
                subject TEXT NOT NULL,
                success BOOLEAN NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_date TEXT NOT NULL,
                jobs_found INTEGER NOT NULL,
                jobs_validated INTEGER NOT NULL,
                jobs_new INTEGER NOT NULL,
                duration_seconds REAL NOT NULL,
                success BOOLEAN NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_unsent ON jobs(sent, score DESC, first_seen DESC);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_first_seen ON jobs(first_seen);")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_runs_date ON search_runs(run_date);")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Insert a newly discovered job, or refresh last_seen, score and the raw
    /// payload of a known one. first_seen and the send state never change here.
    pub async fn upsert(&self, job: &JobPosting) -> Result<UpsertOutcome> {
        let now = Utc::now();
        let raw_data = serde_json::to_string(job).context("Failed to serialize job payload")?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO jobs (
                url, title, company, location, salary, score, source,
                first_seen, last_seen, sent, raw_data
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&job.url)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(job.score)
        .bind(&job.source)
        .bind(now)
        .bind(now)
        .bind(&raw_data)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert job: {}", job.url))?
        .rows_affected()
            == 1;

        if !inserted {
            sqlx::query(
                r#"
                UPDATE jobs
                SET last_seen = ?, score = ?, raw_data = ?
                WHERE url = ?
                "#,
            )
            .bind(now)
            .bind(job.score)
            .bind(&raw_data)
            .bind(&job.url)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to refresh job: {}", job.url))?;
        }

        tx.commit().await?;

        debug!(url = %job.url, new = inserted, "Upserted job");
        Ok(UpsertOutcome { new: inserted })
    }

    pub async fn get(&self, url: &str) -> Result<Option<StoredJob>> {
        let job = sqlx::query_as::<_, StoredJob>(&format!(
            "SELECT {} FROM jobs WHERE url = ?",
            JOB_COLUMNS
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    /// Unsent jobs, best candidates first
    pub async fn list_unsent(&self, limit: Option<usize>) -> Result<Vec<StoredJob>> {
        let jobs = sqlx::query_as::<_, StoredJob>(&format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE sent = FALSE
            ORDER BY score DESC, first_seen DESC, id DESC
            LIMIT ?
            "#,
            JOB_COLUMNS
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Most recently discovered jobs, for display
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<StoredJob>> {
        let jobs = sqlx::query_as::<_, StoredJob>(&format!(
            r#"
            SELECT {}
            FROM jobs
            ORDER BY first_seen DESC, id DESC
            LIMIT ?
            "#,
            JOB_COLUMNS
        ))
        .bind(sql_limit(Some(limit)))
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Flag jobs as delivered. Unknown urls are skipped.
    pub async fn mark_sent(&self, urls: &[String]) -> Result<u64> {
        if urls.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut updated = 0;
        let mut tx = self.pool.begin().await?;

        for url in urls {
            updated += sqlx::query(
                r#"
                UPDATE jobs
                SET sent = TRUE, sent_date = ?
                WHERE url = ?
                "#,
            )
            .bind(now)
            .bind(url)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to mark job sent: {}", url))?
            .rows_affected();
        }

        tx.commit().await?;

        info!("Marked {} of {} jobs as sent", updated, urls.len());
        Ok(updated)
    }

    pub async fn record_email(
        &self,
        recipient: &str,
        job_count: usize,
        subject: &str,
        success: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_log (sent_date, recipient, job_count, subject, success)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now())
        .bind(recipient)
        .bind(job_count as i64)
        .bind(subject)
        .bind(success)
        .execute(&self.pool)
        .await
        .context("Failed to record email send")?;

        Ok(())
    }

    pub async fn record_run(
        &self,
        jobs_found: usize,
        jobs_validated: usize,
        jobs_new: usize,
        duration: Duration,
        success: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO search_runs (
                run_date, jobs_found, jobs_validated, jobs_new, duration_seconds, success
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now())
        .bind(jobs_found as i64)
        .bind(jobs_validated as i64)
        .bind(jobs_new as i64)
        .bind(duration.as_secs_f64())
        .bind(success)
        .execute(&self.pool)
        .await
        .context("Failed to record search run")?;

        Ok(())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let total_jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;

        let sent_jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE sent = TRUE")
            .fetch_one(&self.pool)
            .await?;

        let unsent_jobs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE sent = FALSE")
                .fetch_one(&self.pool)
                .await?;

        let total_emails: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_log")
            .fetch_one(&self.pool)
            .await?;

        let last_run = self.recent_runs(1).await?.into_iter().next();

        Ok(StoreStats {
            total_jobs,
            sent_jobs,
            unsent_jobs,
            total_emails,
            last_run,
        })
    }

    pub async fn recent_runs(&self, limit: usize) -> Result<Vec<SearchRunEntry>> {
        let runs = sqlx::query_as::<_, SearchRunEntry>(
            r#"
            SELECT id, run_date, jobs_found, jobs_validated, jobs_new, duration_seconds, success
            FROM search_runs
            ORDER BY run_date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(sql_limit(Some(limit)))
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }

    pub async fn recent_emails(&self, limit: usize) -> Result<Vec<EmailLogEntry>> {
        let emails = sqlx::query_as::<_, EmailLogEntry>(
            r#"
            SELECT id, sent_date, recipient, job_count, subject, success
            FROM email_log
            ORDER BY sent_date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(sql_limit(Some(limit)))
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }
}

/// SQLite treats a negative LIMIT as "no limit"
fn sql_limit(limit: Option<usize>) -> i64 {
    limit
        .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
        .unwrap_or(-1)
}
