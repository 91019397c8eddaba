// src/validation/validator.rs
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::ValidationResult;
use crate::core::config_manager::ValidationConfig;
use crate::error::ValidationError;
use crate::types::Listing;
use crate::utils::normalize_keywords;

const APPLY_CANDIDATES: &str = "button, a, input";

/// Fetches posting pages and decides whether they still take applications.
pub struct JobValidator {
    client: Client,
    closed_phrases: Vec<String>,
    apply_phrases: Vec<String>,
}

impl JobValidator {
    pub fn new(config: &ValidationConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            closed_phrases: normalize_keywords(&config.closed_phrases),
            apply_phrases: normalize_keywords(&config.apply_phrases),
        })
    }

    /// Fetch and classify one posting. Failures are reported on the result,
    /// never returned as errors.
    pub async fn validate(&self, url: &str) -> ValidationResult {
        debug!("Fetching job post: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ValidationResult::failed(None, ValidationError::Timeout)
            }
            Err(e) => return ValidationResult::failed(None, ValidationError::transport(e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return ValidationResult::failed(
                Some(status.as_u16()),
                ValidationError::Status(status.as_u16()),
            );
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) if e.is_timeout() => {
                return ValidationResult::failed(Some(status.as_u16()), ValidationError::Timeout)
            }
            Err(e) => {
                return ValidationResult::failed(
                    Some(status.as_u16()),
                    ValidationError::unexpected(e),
                )
            }
        };

        let mut result = self.inspect_document(&html);
        result.status_code = Some(status.as_u16());
        result
    }

    /// Classify an already-fetched page
    pub fn inspect_document(&self, html: &str) -> ValidationResult {
        let document = Html::parse_document(html);
        let page_text = document.root_element().text().collect::<String>().to_lowercase();

        if self.closed_phrases.iter().any(|p| page_text.contains(p.as_str())) {
            return ValidationResult {
                is_closed: true,
                error: Some(ValidationError::Closed),
                ..Default::default()
            };
        }

        let selector = match Selector::parse(APPLY_CANDIDATES) {
            Ok(selector) => selector,
            Err(e) => return ValidationResult::failed(None, ValidationError::unexpected(e)),
        };

        let has_apply_indicator = document
            .select(&selector)
            .any(|element| self.is_apply_element(&element));

        ValidationResult {
            valid: has_apply_indicator,
            has_apply_indicator,
            error: (!has_apply_indicator).then_some(ValidationError::NoApplyIndicator),
            ..Default::default()
        }
    }

    fn is_apply_element(&self, element: &ElementRef) -> bool {
        let text = element.text().collect::<String>().to_lowercase();
        // source order; scraper sorts classes()
        let classes = element
            .value()
            .attr("class")
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let id = element.value().id().unwrap_or_default().to_lowercase();

        self.apply_phrases.iter().any(|phrase| {
            text.contains(phrase.as_str())
                || classes.contains(phrase.as_str())
                || id.contains(phrase.as_str())
        })
    }

    /// Validate in order with a pause between requests. Returns the live
    /// items and the rejected ones with their results, both in input order.
    pub async fn partition_live<T: Listing>(
        &self,
        items: Vec<T>,
        delay: Duration,
    ) -> (Vec<T>, Vec<(T, ValidationResult)>) {
        let total = items.len();
        let mut live = Vec::new();
        let mut rejected = Vec::new();

        for (i, item) in items.into_iter().enumerate() {
            info!("[{}/{}] Validating: {}", i + 1, total, item.title());
            let result = self.validate(item.url()).await;

            if result.valid {
                debug!(url = %item.url(), "Posting is live");
                live.push(item);
            } else {
                let reason = result.reason().unwrap_or_default();
                if result.error.as_ref().is_some_and(|e| e.is_transport()) {
                    warn!(url = %item.url(), %reason, "Posting unreachable, dropped this run");
                } else {
                    info!(url = %item.url(), %reason, "Posting rejected");
                }
                rejected.push((item, result));
            }

            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        info!("Validation complete: {}/{} jobs valid", live.len(), total);
        (live, rejected)
    }

    pub async fn validate_all<T: Listing>(&self, items: Vec<T>, delay: Duration) -> Vec<T> {
        self.partition_live(items, delay).await.0
    }
}
