use serde::{Serialize, Serializer};

use crate::error::ValidationError;

/// Outcome of checking a single posting URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub status_code: Option<u16>,
    pub has_apply_indicator: bool,
    pub is_closed: bool,
    #[serde(serialize_with = "serialize_reason")]
    pub error: Option<ValidationError>,
}

impl ValidationResult {
    pub fn failed(status_code: Option<u16>, error: ValidationError) -> Self {
        Self {
            status_code,
            error: Some(error),
            ..Default::default()
        }
    }

    /// Human-readable rejection reason, if any
    pub fn reason(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

fn serialize_reason<S>(error: &Option<ValidationError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
