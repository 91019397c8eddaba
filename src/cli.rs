// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::core::config_manager::DEFAULT_CONFIG_PATH;
use crate::core::{AgentMailClient, AppConfig, ConfigManager, FsOps, JobStore};
use crate::digest::DigestSender;
use crate::pipeline::{DigestStatus, Pipeline, RunReport, RunStage};
use crate::search::SearchHandoff;
use crate::types::{JobPosting, StoreStats, StoredJob};
use crate::validation::JobValidator;
use crate::web::start_dashboard;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PENDING: u8 = 2;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Daily job search: score, validate, store and email new postings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or upgrade the job database
    Init,
    /// Generate search queries and write them for the search agent
    Queries,
    /// Run the daily pipeline
    Run,
    /// Validate a JSON file of jobs and write the live ones
    Validate {
        file: PathBuf,
        #[arg(long, default_value = "validated_jobs.json")]
        output: PathBuf,
    },
    /// Send a digest of the unsent jobs now
    Send,
    /// Show database statistics
    Stats,
    /// List stored jobs
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only jobs not yet emailed
        #[arg(long)]
        unsent: bool,
        /// Export the listing as CSV instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Serve the read-only dashboard
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        address: IpAddr,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

pub async fn handle_command(cli: Cli) -> Result<ExitCode> {
    let config = ConfigManager::load(&cli.config)?;

    match cli.command {
        Command::Init => {
            config.ensure_directories().await?;
            let store = JobStore::open(&config.storage.database_path).await?;
            store.health_check().await?;
            println!(
                "✅ Database ready: {}",
                config.storage.database_path.display()
            );
            Ok(ExitCode::from(EXIT_SUCCESS))
        }

        Command::Queries => {
            let queries = crate::search::generate_queries(&config.search);
            let handoff = SearchHandoff::new(&config.storage.handoff_dir);
            let ticket = handoff.begin(&queries).await?;

            for (i, query) in queries.iter().enumerate() {
                println!("{:>2}. {}", i + 1, query);
            }
            println!(
                "\nRun {}: wrote {} queries to {}",
                ticket.run_id,
                queries.len(),
                handoff.queries_path().display()
            );
            Ok(ExitCode::from(EXIT_SUCCESS))
        }

        Command::Run => run_pipeline(&config).await,

        Command::Validate { file, output } => validate_file(&config, &file, &output).await,

        Command::Send => send_unsent(&config).await,

        Command::Stats => {
            let store = JobStore::open_read_only(&config.storage.database_path).await?;
            print_stats(&store.stats().await?);
            Ok(ExitCode::from(EXIT_SUCCESS))
        }

        Command::Jobs { limit, unsent, csv } => {
            let store = JobStore::open_read_only(&config.storage.database_path).await?;
            let jobs = if unsent {
                store.list_unsent(Some(limit)).await?
            } else {
                store.list_recent(limit).await?
            };

            match csv {
                Some(path) => {
                    export_csv(&jobs, &path).await?;
                    println!("✅ Exported {} jobs to {}", jobs.len(), path.display());
                }
                None => print_jobs(&jobs),
            }
            Ok(ExitCode::from(EXIT_SUCCESS))
        }

        Command::Serve { address, port } => {
            let store = JobStore::open_read_only(&config.storage.database_path).await?;
            start_dashboard(store, address, port).await?;
            Ok(ExitCode::from(EXIT_SUCCESS))
        }
    }
}

fn mail_client(config: &AppConfig) -> Result<AgentMailClient> {
    let api_key = config.mail_api_key()?;
    AgentMailClient::new(
        &config.email.api_base_url,
        api_key,
        config.validation.timeout(),
    )
}

async fn run_pipeline(config: &AppConfig) -> Result<ExitCode> {
    config.ensure_directories().await?;
    let store = JobStore::open(&config.storage.database_path).await?;
    let validator = JobValidator::new(&config.validation)?;
    let handoff = SearchHandoff::new(&config.storage.handoff_dir);

    let pipeline = Pipeline::new(config, &store, &validator, &handoff);

    let collected = match pipeline.collect().await? {
        RunStage::Pending(pending) => {
            println!("⏸  Run {} is waiting for search results.", pending.run_id);
            println!(
                "   Execute the {} queries in {}",
                pending.query_count,
                pending.queries_path.display()
            );
            println!(
                "   and save the results to {}, then re-run.",
                pending.results_path.display()
            );
            return Ok(ExitCode::from(EXIT_PENDING));
        }
        RunStage::Ready(collected) => collected,
    };
    info!(
        "Run {}: {} candidate jobs from the search agent",
        collected.run_id(),
        collected.candidates().len()
    );

    // only needed once there is something to send
    let mailer = mail_client(config)?;
    let report = pipeline.finish(collected, &mailer).await?;

    print_report(&report);
    print_stats(&store.stats().await?);
    Ok(ExitCode::from(if report.success {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }))
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum JobFile {
    List(Vec<JobPosting>),
    Wrapped { jobs: Vec<JobPosting> },
}

async fn validate_file(config: &AppConfig, file: &Path, output: &Path) -> Result<ExitCode> {
    let jobs = match FsOps::read_json::<JobFile>(file).await? {
        JobFile::List(jobs) => jobs,
        JobFile::Wrapped { jobs } => jobs,
    };
    let total = jobs.len();
    info!("Validating {} jobs from {}", total, file.display());

    let validator = JobValidator::new(&config.validation)?;
    let valid = validator.validate_all(jobs, config.validation.delay()).await;

    FsOps::write_json(output, &valid).await?;
    println!("Validation complete: {}/{} jobs valid", valid.len(), total);
    println!("✅ Saved to {}", output.display());
    Ok(ExitCode::from(EXIT_SUCCESS))
}

async fn send_unsent(config: &AppConfig) -> Result<ExitCode> {
    let store = JobStore::open(&config.storage.database_path).await?;
    let unsent = store.list_unsent(Some(config.email.top_count)).await?;

    if unsent.is_empty() {
        println!("No unsent jobs found in database");
        return Ok(ExitCode::from(EXIT_SUCCESS));
    }
    println!("Found {} unsent jobs", unsent.len());

    let validator = JobValidator::new(&config.validation)?;
    let mailer = mail_client(config)?;
    let sender = DigestSender::new(
        &config.email,
        &store,
        &validator,
        &mailer,
        config.validation.delay(),
    );

    let outcome = sender
        .send(unsent.iter().map(StoredJob::posting).collect())
        .await?;

    if outcome.is_success() {
        println!("✅ Digest sent: {:?}", outcome);
        Ok(ExitCode::from(EXIT_SUCCESS))
    } else {
        error!("Digest delivery failed: {:?}", outcome);
        println!("❌ Failed to send job email");
        Ok(ExitCode::from(EXIT_FAILURE))
    }
}

fn print_report(report: &RunReport) {
    println!("{}", "=".repeat(60));
    println!("SUMMARY");
    println!("{}", "=".repeat(60));
    if let Some(run_id) = report.run_id {
        println!("Run: {}", run_id);
    }
    println!("Found: {}", report.jobs_found);
    println!("Validated: {}", report.jobs_validated);
    println!("New this run: {}", report.jobs_new);
    let digest = match &report.digest {
        DigestStatus::Skipped => "skipped (no new jobs)".to_string(),
        DigestStatus::NothingUnsent => "nothing unsent".to_string(),
        DigestStatus::Delivered(outcome) => format!("{:?}", outcome),
        DigestStatus::Errored(e) => format!("error: {}", e),
    };
    println!("Digest: {}", digest);
    println!("Duration: {:.1}s", report.duration.as_secs_f64());
    if report.success {
        println!("\n✅ Daily run complete!");
    } else {
        warn!("Run finished unsuccessfully");
        println!("\n❌ Daily run finished with errors");
    }
}

fn print_stats(stats: &StoreStats) {
    println!("Total jobs in database: {}", stats.total_jobs);
    println!("Sent: {}", stats.sent_jobs);
    println!("Unsent: {}", stats.unsent_jobs);
    println!("Emails: {}", stats.total_emails);
    if let Some(run) = &stats.last_run {
        println!(
            "Last run: {} (found {}, new {}, {})",
            run.run_date.format("%Y-%m-%d %H:%M"),
            run.jobs_found,
            run.jobs_new,
            if run.success { "ok" } else { "failed" }
        );
    }
}

fn print_jobs(jobs: &[StoredJob]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }

    println!(
        "{:<6} {:<35} {:<20} {:<20} {:<8}",
        "Score", "Title", "Company", "Location", "Status"
    );
    println!("{}", "-".repeat(92));
    for job in jobs {
        println!(
            "{:<6} {:<35} {:<20} {:<20} {:<8}",
            job.score,
            crate::utils::truncate_chars(&job.title, 34),
            crate::utils::truncate_chars(&job.company, 19),
            crate::utils::truncate_chars(&job.location, 19),
            if job.sent { "sent" } else { "pending" }
        );
        println!("       {}", job.url);
    }
}

#[derive(Serialize)]
struct JobCsvRow<'a> {
    url: &'a str,
    title: &'a str,
    company: &'a str,
    location: &'a str,
    salary: &'a str,
    score: i64,
    source: &'a str,
    first_seen: String,
    sent: bool,
}

async fn export_csv(jobs: &[StoredJob], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for job in jobs {
        writer
            .serialize(JobCsvRow {
                url: &job.url,
                title: &job.title,
                company: &job.company,
                location: &job.location,
                salary: job.salary.as_deref().unwrap_or_default(),
                score: job.score,
                source: &job.source,
                first_seen: job.first_seen.to_rfc3339(),
                sent: job.sent,
            })
            .context("Failed to write CSV row")?;
    }

    let bytes = writer.into_inner().context("Failed to finish CSV export")?;
    let content = String::from_utf8(bytes).context("CSV export is not valid UTF-8")?;
    FsOps::write_file_safe(path, &content).await
}
