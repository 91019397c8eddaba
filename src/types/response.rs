use serde::{Deserialize, Serialize};

// ===== Mail Service Types =====

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub to: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<&'a str>,
    pub subject: &'a str,
    pub text: &'a str,
    pub html: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MailServiceError {
    #[serde(alias = "error", alias = "name")]
    pub message: String,
}
