// src/digest/sender.rs
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use super::formatter::DigestFormatter;
use crate::core::config_manager::EmailConfig;
use crate::core::{JobStore, Mailer, OutboundMessage};
use crate::error::ValidationError;
use crate::types::JobPosting;
use crate::validation::JobValidator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DigestOutcome {
    /// Every recipient accepted the message
    Sent { job_count: usize },
    /// Nothing survived re-validation; no message was sent
    Empty,
    Failed {
        job_count: usize,
        failed_recipients: Vec<String>,
    },
}

impl DigestOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Re-checks, renders and delivers a digest, then records the send state.
pub struct DigestSender<'a> {
    config: &'a EmailConfig,
    store: &'a JobStore,
    validator: &'a JobValidator,
    mailer: &'a dyn Mailer,
    delay: Duration,
}

impl<'a> DigestSender<'a> {
    pub fn new(
        config: &'a EmailConfig,
        store: &'a JobStore,
        validator: &'a JobValidator,
        mailer: &'a dyn Mailer,
        delay: Duration,
    ) -> Self {
        Self {
            config,
            store,
            validator,
            mailer,
            delay,
        }
    }

    /// Send the given jobs, best first. Jobs whose page went stale since they
    /// were stored are marked sent so they are not retried, and left out.
    /// Unreachable ones are only left out and stay unsent for the next run.
    pub async fn send(&self, jobs: Vec<JobPosting>) -> Result<DigestOutcome> {
        if self.config.recipients.is_empty() {
            anyhow::bail!("email.recipients is empty, nobody to send the digest to");
        }

        info!("Re-validating {} jobs before sending", jobs.len());
        let (live, rejected) = self.validator.partition_live(jobs, self.delay).await;

        let (unreachable, stale): (Vec<_>, Vec<_>) = rejected
            .into_iter()
            .partition(|(_, result)| {
                result
                    .error
                    .as_ref()
                    .is_some_and(ValidationError::is_transport)
            });

        if !unreachable.is_empty() {
            warn!("Holding back {} unreachable jobs until the next run", unreachable.len());
        }
        if !stale.is_empty() {
            let stale_urls: Vec<String> = stale.iter().map(|(job, _)| job.url.clone()).collect();
            warn!("Suppressing {} stale jobs", stale_urls.len());
            self.store.mark_sent(&stale_urls).await?;
        }

        let formatter = DigestFormatter::new(&self.config.digest_title);
        let Some(digest) = formatter.format(&live, self.config.top_count) else {
            info!("No live jobs left to send");
            return Ok(DigestOutcome::Empty);
        };

        let job_count = digest.included.len();
        let mut failed_recipients = Vec::new();

        for recipient in &self.config.recipients {
            let message = OutboundMessage {
                from: self.config.from.clone(),
                to: recipient.clone(),
                bcc: self.config.bcc.clone(),
                subject: digest.subject.clone(),
                text: digest.text.clone(),
                html: digest.html.clone(),
            };

            info!(
                "Sending to {}... (BCC: {})",
                recipient,
                self.config.bcc.as_deref().unwrap_or("none")
            );
            let delivered = match self.mailer.send(&message).await {
                Ok(_) => true,
                Err(e) => {
                    error!("Failed to send to {}: {}", recipient, e);
                    failed_recipients.push(recipient.clone());
                    false
                }
            };

            self.store
                .record_email(recipient, job_count, &digest.subject, delivered)
                .await?;
        }

        if !failed_recipients.is_empty() {
            return Ok(DigestOutcome::Failed {
                job_count,
                failed_recipients,
            });
        }

        self.store.mark_sent(&digest.included).await?;
        info!("Marked {} jobs as sent", job_count);
        Ok(DigestOutcome::Sent { job_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_manager::ValidationConfig;
    use crate::error::DeliveryError;
    use crate::types::response::SendMessageResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records messages and refuses the listed recipients
    #[derive(Default)]
    struct RecordingMailer {
        refuse: Vec<String>,
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            message: &OutboundMessage,
        ) -> Result<SendMessageResponse, DeliveryError> {
            if self.refuse.contains(&message.to) {
                return Err(DeliveryError::Transport("connection reset".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(SendMessageResponse::default())
        }
    }

    fn email_config(recipients: &[&str], top_count: usize) -> EmailConfig {
        EmailConfig {
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            bcc: Some("bcc@example.com".to_string()),
            from: "scout@agentmail.to".to_string(),
            top_count,
            digest_title: "Job Search".to_string(),
            api_base_url: "http://unused".to_string(),
            api_key_file: None,
        }
    }

    async fn live_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("^/live".to_string()))
            .with_status(200)
            .with_body("<button>Apply now</button>")
            .create_async()
            .await;
        server
            .mock("GET", mockito::Matcher::Regex("^/stale".to_string()))
            .with_status(404)
            .create_async()
            .await;
        server
    }

    async fn seed(store: &JobStore, urls: &[String]) -> Vec<JobPosting> {
        let mut jobs = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            let mut job = JobPosting::new(url, &format!("Role {}", i), "Acme", "Venice, CA");
            job.score = 20 - i as i64;
            store.upsert(&job).await.expect("seed");
            jobs.push(job);
        }
        jobs
    }

    #[tokio::test]
    async fn test_success_marks_only_included_jobs() {
        let server = live_server().await;
        let store = JobStore::in_memory().await.expect("store");
        let validator = JobValidator::new(&ValidationConfig::default()).expect("validator");
        let mailer = RecordingMailer::default();
        let config = email_config(&["a@example.com", "b@example.com"], 1);

        let urls = vec![
            format!("{}/live/1", server.url()),
            format!("{}/stale/2", server.url()),
            format!("{}/live/3", server.url()),
        ];
        let jobs = seed(&store, &urls).await;

        let sender = DigestSender::new(&config, &store, &validator, &mailer, Duration::ZERO);
        let outcome = sender.send(jobs).await.expect("send");

        assert_eq!(outcome, DigestOutcome::Sent { job_count: 1 });
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);

        let unsent = store.list_unsent(None).await.expect("unsent");
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].url, urls[2]);
        assert!(store.get(&urls[1]).await.expect("get").expect("stale").sent);

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.total_emails, 2);
    }

    #[tokio::test]
    async fn test_failed_recipient_keeps_jobs_unsent() {
        let server = live_server().await;
        let store = JobStore::in_memory().await.expect("store");
        let validator = JobValidator::new(&ValidationConfig::default()).expect("validator");
        let mailer = RecordingMailer {
            refuse: vec!["a@example.com".to_string()],
            ..Default::default()
        };
        let config = email_config(&["a@example.com", "b@example.com"], 10);

        let urls = vec![format!("{}/live/1", server.url())];
        let jobs = seed(&store, &urls).await;

        let sender = DigestSender::new(&config, &store, &validator, &mailer, Duration::ZERO);
        let outcome = sender.send(jobs).await.expect("send");

        assert!(!outcome.is_success());
        // the second recipient still got the message
        assert_eq!(mailer.sent.lock().unwrap()[0].to, "b@example.com");
        assert_eq!(store.list_unsent(None).await.expect("unsent").len(), 1);

        let emails = store.recent_emails(10).await.expect("emails");
        assert_eq!(emails.iter().filter(|e| !e.success).count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_job_stays_unsent() {
        let server = live_server().await;
        let store = JobStore::in_memory().await.expect("store");
        let validator = JobValidator::new(&ValidationConfig::default()).expect("validator");
        let mailer = RecordingMailer::default();
        let config = email_config(&["a@example.com"], 10);

        let urls = vec![
            "http://127.0.0.1:1/job".to_string(),
            format!("{}/live/2", server.url()),
        ];
        let jobs = seed(&store, &urls).await;

        let sender = DigestSender::new(&config, &store, &validator, &mailer, Duration::ZERO);
        let outcome = sender.send(jobs).await.expect("send");

        assert_eq!(outcome, DigestOutcome::Sent { job_count: 1 });
        assert!(!mailer.sent.lock().unwrap()[0].text.contains("127.0.0.1:1/job"));

        let unreachable = store.get(&urls[0]).await.expect("get").expect("stored");
        assert!(!unreachable.sent);
        assert!(store.get(&urls[1]).await.expect("get").expect("stored").sent);
    }

    #[tokio::test]
    async fn test_all_stale_sends_nothing() {
        let server = live_server().await;
        let store = JobStore::in_memory().await.expect("store");
        let validator = JobValidator::new(&ValidationConfig::default()).expect("validator");
        let mailer = RecordingMailer::default();
        let config = email_config(&["a@example.com"], 10);

        let urls = vec![format!("{}/stale/1", server.url())];
        let jobs = seed(&store, &urls).await;

        let sender = DigestSender::new(&config, &store, &validator, &mailer, Duration::ZERO);
        let outcome = sender.send(jobs).await.expect("send");

        assert_eq!(outcome, DigestOutcome::Empty);
        assert!(outcome.is_success());
        assert!(mailer.sent.lock().unwrap().is_empty());
        assert_eq!(store.stats().await.expect("stats").total_emails, 0);
    }
}
