use async_trait::async_trait;
use job_scout::core::{FsOps, Mailer, OutboundMessage};
use job_scout::digest::DigestOutcome;
use job_scout::error::DeliveryError;
use job_scout::pipeline::{DigestStatus, PendingRun, RunStage};
use job_scout::search::SearchHandoff;
use job_scout::types::response::SendMessageResponse;
use job_scout::validation::JobValidator;
use job_scout::{AppConfig, JobStore, Pipeline, RunOutcome, RunReport};
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<OutboundMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<SendMessageResponse, DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(SendMessageResponse::default())
    }
}

fn config(handoff_dir: &Path) -> AppConfig {
    let mut config = AppConfig::from_yaml_str(
        r#"
search:
  target_companies: [Acme]
  job_titles: [Engineer]
  locations: [Santa Monica]
scoring:
  location_match: 5
  title_match: 5
  company_match: 5
  industry_match: 5
  creative_industry: 3
email:
  recipients: [me@example.com]
  from: scout@agentmail.to
  top_count: 10
validation:
  delay_ms: 0
  timeout_secs: 5
"#,
    )
    .expect("config parses");
    config.storage.handoff_dir = handoff_dir.to_path_buf();
    config
}

async fn job_server() -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", mockito::Matcher::Regex("^/jobs/live".to_string()))
        .with_status(200)
        .with_body("<html><body><h1>Role</h1><a class='btn'>Apply now</a></body></html>")
        .expect_at_least(1)
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex("^/jobs/closed".to_string()))
        .with_status(200)
        .with_body("<html><body>This position closed. <button>Apply now</button></body></html>")
        .create_async()
        .await;
    server
}

async fn write_results(handoff: &SearchHandoff, base: &str) {
    let records = serde_json::json!([
        {
            "url": format!("{}/jobs/live/1", base),
            "title": "Senior Engineer",
            "company": "Acme Studio",
            "location": "Los Angeles, CA"
        },
        {
            "url": format!("{}/jobs/live/2", base),
            "title": "Product Designer at Globex",
            "description": "Hybrid in Santa Monica, CA"
        },
        {
            "url": format!("{}/jobs/closed/3", base),
            "title": "Engineer - Initech"
        },
        {
            "url": format!("{}/jobs/live/1", base),
            "title": "Duplicate of the first",
            "company": "Acme Studio"
        }
    ]);
    FsOps::write_json(&handoff.results_path(), &records)
        .await
        .expect("write results");
}

fn completed(outcome: RunOutcome) -> RunReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::Pending(PendingRun { run_id, .. }) => panic!("run {} unexpectedly pending", run_id),
    }
}

#[tokio::test]
async fn test_pending_then_completed_then_idempotent_rerun() {
    let server = job_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(&dir.path().join("handoff"));
    let store = JobStore::in_memory().await.expect("store");
    let validator = JobValidator::new(&config.validation).expect("validator");
    let handoff = SearchHandoff::new(&config.storage.handoff_dir);
    let mailer = RecordingMailer::default();
    let pipeline = Pipeline::new(&config, &store, &validator, &handoff);

    // No results yet: the run waits and nothing is logged
    let pending_id = match pipeline.run(&mailer).await.expect("first run") {
        RunOutcome::Pending(PendingRun { run_id, queries_path, .. }) => {
            assert!(queries_path.exists());
            run_id
        }
        RunOutcome::Completed(_) => panic!("expected pending"),
    };
    assert!(matches!(
        pipeline.run(&mailer).await.expect("re-entry"),
        RunOutcome::Pending(PendingRun { run_id, .. }) if run_id == pending_id
    ));
    assert!(store.stats().await.expect("stats").last_run.is_none());

    write_results(&handoff, &server.url()).await;
    let report = completed(pipeline.run(&mailer).await.expect("second run"));

    assert_eq!(report.run_id, Some(pending_id));
    assert_eq!(report.jobs_found, 3);
    assert_eq!(report.jobs_validated, 2);
    assert_eq!(report.jobs_new, 2);
    assert_eq!(
        report.digest,
        DigestStatus::Delivered(DigestOutcome::Sent { job_count: 2 })
    );
    assert!(report.success);

    let top = store
        .get(&format!("{}/jobs/live/1", server.url()))
        .await
        .expect("get")
        .expect("stored");
    assert_eq!(top.score, 13);
    assert!(top.sent);

    let designer = store
        .get(&format!("{}/jobs/live/2", server.url()))
        .await
        .expect("get")
        .expect("stored");
    assert_eq!(designer.company, "Globex");
    assert_eq!(designer.location, "Santa Monica, CA");

    {
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.starts_with("Job Search - 2 Top Matches"));
        assert!(sent[0].subject.ends_with("Top 2 Matches"));
    }

    // Same results again under a new run: nothing new, nothing sent
    write_results(&handoff, &server.url()).await;
    let rerun = completed(pipeline.run(&mailer).await.expect("third run"));
    assert_ne!(rerun.run_id, Some(pending_id));
    assert_eq!(rerun.jobs_new, 0);
    assert_eq!(rerun.digest, DigestStatus::Skipped);
    assert!(rerun.success);

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total_jobs, 2);
    assert_eq!(stats.sent_jobs, 2);
    assert_eq!(stats.total_emails, 1);
    assert_eq!(store.recent_runs(10).await.expect("runs").len(), 2);
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_failure_keeps_jobs_for_retry() {
    let server = job_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path());
    let store = JobStore::in_memory().await.expect("store");
    let validator = JobValidator::new(&config.validation).expect("validator");
    let handoff = SearchHandoff::new(&config.storage.handoff_dir);
    let mailer = RecordingMailer {
        fail: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(&config, &store, &validator, &handoff);

    handoff.begin(&[]).await.expect("begin");
    write_results(&handoff, &server.url()).await;
    let report = completed(pipeline.run(&mailer).await.expect("run"));

    assert_eq!(report.jobs_new, 2);
    assert!(!report.success);
    assert!(matches!(
        report.digest,
        DigestStatus::Delivered(DigestOutcome::Failed { .. })
    ));

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.unsent_jobs, 2);
    assert_eq!(stats.total_emails, 1);
    let last = stats.last_run.expect("run logged");
    assert!(!last.success);
    assert_eq!(last.jobs_new, 2);

    let emails = store.recent_emails(5).await.expect("emails");
    assert!(!emails[0].success);
}

#[tokio::test]
async fn test_persist_failure_keeps_results_for_retry() {
    let server = job_server().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(&dir.path().join("handoff"));
    let db_path = dir.path().join("jobs.db");
    let store = JobStore::open(&db_path).await.expect("store");

    // Reject every job insert while leaving the run log writable
    let raw = sqlx::SqlitePool::connect(&format!("sqlite://{}", db_path.display()))
        .await
        .expect("raw connection");
    sqlx::query(
        "CREATE TRIGGER reject_jobs BEFORE INSERT ON jobs \
         BEGIN SELECT RAISE(ABORT, 'jobs table is read-only'); END;",
    )
    .execute(&raw)
    .await
    .expect("trigger");
    raw.close().await;

    let validator = JobValidator::new(&config.validation).expect("validator");
    let handoff = SearchHandoff::new(&config.storage.handoff_dir);
    let mailer = RecordingMailer::default();
    let pipeline = Pipeline::new(&config, &store, &validator, &handoff);

    handoff.begin(&[]).await.expect("begin");
    write_results(&handoff, &server.url()).await;

    let collected = match pipeline.collect().await.expect("collect") {
        RunStage::Ready(collected) => collected,
        RunStage::Pending(pending) => panic!("run {} unexpectedly pending", pending.run_id),
    };
    assert_eq!(collected.candidates().len(), 3);
    let run_id = collected.run_id();

    let err = pipeline
        .finish(collected, &mailer)
        .await
        .expect_err("persisting must fail");
    assert!(format!("{:#}", err).contains("read-only"));

    // Results and ticket are untouched, so the next run retries the batch
    assert!(handoff.results_path().exists());
    assert_eq!(
        handoff.pending().await.expect("pending").map(|t| t.run_id),
        Some(run_id)
    );

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total_jobs, 0);
    let last = stats.last_run.expect("failed run logged");
    assert!(!last.success);
    assert_eq!(last.jobs_found, 3);
    assert_eq!(last.jobs_validated, 2);
    assert_eq!(last.jobs_new, 0);
    assert!(mailer.sent.lock().unwrap().is_empty());
}
