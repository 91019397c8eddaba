//! Classified failures of the outbound collaborators.
//!
//! Plumbing errors travel as `anyhow::Error`. The types here exist for the
//! failures callers branch on: why a posting was rejected, and whether a
//! mail delivery failed in transport or was refused by the service.

use thiserror::Error;

use crate::utils::truncate_chars;

/// Longest detail kept from an underlying transport error message.
pub const ERROR_DETAIL_MAX_CHARS: usize = 50;

/// Why a job posting did not pass validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The page answered with something other than 200
    #[error("HTTP {0}")]
    Status(u16),

    /// The page text carries a "closed" phrase
    #[error("Job posting appears closed")]
    Closed,

    /// No button, link or input looks like an apply action
    #[error("No Apply button found")]
    NoApplyIndicator,

    #[error("Request timeout")]
    Timeout,

    /// Connection, DNS, TLS or request construction failure
    #[error("Request error: {0}")]
    Transport(String),

    /// Anything else, such as an undecodable body
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ValidationError {
    pub fn transport(detail: impl ToString) -> Self {
        Self::Transport(truncate_chars(&detail.to_string(), ERROR_DETAIL_MAX_CHARS))
    }

    pub fn unexpected(detail: impl ToString) -> Self {
        Self::Unexpected(truncate_chars(&detail.to_string(), ERROR_DETAIL_MAX_CHARS))
    }

    /// Transport failures are retried on the next scheduled run.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }
}

/// Why a digest message was not delivered to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail service rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
