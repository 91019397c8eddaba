// src/core/mail_client.rs
//! Outbound mail over the AgentMail HTTP API

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::DeliveryError;
use crate::types::response::{MailServiceError, SendMessageRequest, SendMessageResponse};
use crate::utils::truncate_chars;

const SEND_ENDPOINT: &str = "/v0/inboxes/{inbox}/messages/send";
const ERROR_BODY_MAX_CHARS: usize = 200;

/// One rendered digest addressed to a single recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Sending inbox id
    pub from: String,
    pub to: String,
    pub bcc: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMessage)
        -> Result<SendMessageResponse, DeliveryError>;
}

pub struct AgentMailClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AgentMailClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn send_url(&self, inbox: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            SEND_ENDPOINT.replace("{inbox}", inbox)
        )
    }
}

#[async_trait]
impl Mailer for AgentMailClient {
    async fn send(
        &self,
        message: &OutboundMessage,
    ) -> Result<SendMessageResponse, DeliveryError> {
        let url = self.send_url(&message.from);
        let payload = SendMessageRequest {
            to: vec![message.to.as_str()],
            bcc: message.bcc.as_deref().into_iter().collect(),
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        debug!("Calling mail service: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // Some deployments answer 200 with an empty body
            let body = response.text().await.unwrap_or_default();
            let sent: SendMessageResponse = serde_json::from_str(&body).unwrap_or_default();
            info!(
                "Email sent to {} (message id: {})",
                message.to,
                sent.message_id.as_deref().unwrap_or("-")
            );
            Ok(sent)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<MailServiceError>(&error_text)
                .map(|e| e.message)
                .unwrap_or(error_text);

            error!("Mail service rejected message to {}: {} {}", message.to, status, detail);
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: truncate_chars(&detail, ERROR_BODY_MAX_CHARS),
            })
        }
    }
}
