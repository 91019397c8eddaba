// src/types/job.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Anything that points at a posting page and can be validated.
pub trait Listing {
    fn url(&self) -> &str;
    fn title(&self) -> &str;
}

/// A candidate posting as it moves through a run.
///
/// Fields the pipeline does not know about are kept in `extra` so the raw
/// payload stored with the job round-trips whatever the search agent sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub url: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub salary: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub snippet: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobPosting {
    pub fn new(url: &str, title: &str, company: &str, location: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            salary: None,
            source: String::new(),
            snippet: None,
            score: 0,
            extra: Map::new(),
        }
    }
}

impl Listing for JobPosting {
    fn url(&self) -> &str {
        &self.url
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// One row of the `jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredJob {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub score: i64,
    pub source: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sent: bool,
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub raw_data: Option<String>,
}

impl StoredJob {
    /// Rebuild the posting from the stored payload, falling back to the
    /// columns when the payload is missing or no longer parses. The column
    /// score always wins since it is updated together with the payload.
    pub fn posting(&self) -> JobPosting {
        let parsed = self
            .raw_data
            .as_deref()
            .and_then(|raw| serde_json::from_str::<JobPosting>(raw).ok());

        match parsed {
            Some(mut posting) => {
                posting.score = self.score;
                posting
            }
            None => JobPosting {
                url: self.url.clone(),
                title: self.title.clone(),
                company: self.company.clone(),
                location: self.location.clone(),
                salary: self.salary.clone(),
                source: self.source.clone(),
                snippet: None,
                score: self.score,
                extra: Map::new(),
            },
        }
    }
}

/// A single hit returned by the external search agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResult {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
