// src/search/extract.rs
//! Turns raw search hits into job postings

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::core::config_manager::SearchConfig;
use crate::types::{JobPosting, RawSearchResult};
use crate::utils::{clean_text, title_case, truncate_chars};

pub const SNIPPET_MAX_CHARS: usize = 200;
pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_SOURCE: &str = "web_search";

const JOB_INDICATORS: [&str; 11] = [
    "jobs",
    "careers",
    "job",
    "position",
    "apply",
    "greenhouse.io",
    "lever.co",
    "workable.com",
    "linkedin.com/jobs",
    "indeed.com",
    "glassdoor.com",
];

const KNOWN_CAREER_HOSTS: [(&str, &str); 5] = [
    ("amazon.jobs", "Amazon"),
    ("careers.google.com", "Google"),
    ("jobs.apple.com", "Apple"),
    ("jobs.netflix.com", "Netflix"),
    ("disneycareers.com", "Disney"),
];

/// Used when no locations are configured
const WESTSIDE_LOCATIONS: [&str; 12] = [
    "Santa Monica",
    "Venice",
    "Culver City",
    "Playa Vista",
    "Marina del Rey",
    "El Segundo",
    "Manhattan Beach",
    "Hermosa Beach",
    "Redondo Beach",
    "West Los Angeles",
    "Los Angeles",
    "LA",
];

lazy_static! {
    static ref GREENHOUSE_REGEX: Regex =
        Regex::new(r"(?i)^https?://([^./]+)\.greenhouse\.io(?:/([^/?#]+))?").unwrap();
    static ref LEVER_REGEX: Regex =
        Regex::new(r"(?i)^https?://jobs\.lever\.co/([^/?#]+)").unwrap();
    static ref WORKABLE_REGEX: Regex =
        Regex::new(r"(?i)^https?://apply\.workable\.com/([^/?#]+)").unwrap();
}

/// One record in the agent's results file: either a raw hit or a posting the
/// agent already compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandoffRecord {
    Job(JobPosting),
    Search(RawSearchResult),
}

pub struct Extractor {
    location_regex: Regex,
}

impl Extractor {
    pub fn new(search: &SearchConfig) -> Result<Self> {
        let configured: Vec<&str> = search
            .locations
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        let mut names = if configured.is_empty() {
            WESTSIDE_LOCATIONS.to_vec()
        } else {
            configured
        };
        // Longest first so "West Los Angeles" beats "Los Angeles"
        names.sort_by(|a, b| b.len().cmp(&a.len()));

        let alternatives = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?i)\b(?:{})\b(?:,?\s*(?-i:[A-Z]{{2}})\b)?", alternatives);

        let location_regex = Regex::new(&pattern).context("Failed to build location pattern")?;
        Ok(Self { location_regex })
    }

    pub fn extract(&self, result: &RawSearchResult) -> JobPosting {
        let title = clean_text(&result.title);
        let company = infer_company(&result.url, &title);
        let location = self.infer_location(&format!("{} {}", result.description, title));

        let mut job = JobPosting::new(
            &result.url,
            &clean_title(&title, company.as_deref()),
            company.as_deref().unwrap_or(UNKNOWN),
            &location,
        );
        job.source = result
            .provider
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        let snippet = truncate_chars(&result.description, SNIPPET_MAX_CHARS);
        job.snippet = (!snippet.trim().is_empty()).then_some(snippet);
        job
    }

    fn infer_location(&self, text: &str) -> String {
        self.location_regex
            .find(text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

pub fn looks_like_job(result: &RawSearchResult) -> bool {
    let url = result.url.to_lowercase();
    let title = result.title.to_lowercase();
    JOB_INDICATORS
        .iter()
        .any(|i| url.contains(i) || title.contains(i))
}

fn infer_company(url: &str, title: &str) -> Option<String> {
    let lower_url = url.to_lowercase();

    let from_url = if lower_url.contains("greenhouse.io") {
        GREENHOUSE_REGEX.captures(url).and_then(|caps| {
            let subdomain = caps.get(1)?.as_str();
            // Hosted boards put the company in the first path segment
            if subdomain.eq_ignore_ascii_case("boards")
                || subdomain.eq_ignore_ascii_case("job-boards")
            {
                caps.get(2).map(|m| slug_to_name(m.as_str()))
            } else {
                Some(slug_to_name(subdomain))
            }
        })
    } else if lower_url.contains("lever.co") {
        LEVER_REGEX
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| slug_to_name(m.as_str()))
    } else if lower_url.contains("workable.com") {
        WORKABLE_REGEX
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| slug_to_name(m.as_str()))
    } else if lower_url.contains("linkedin.com/jobs") {
        title
            .split(" - ")
            .nth(1)
            .map(|c| c.trim().to_string())
    } else {
        KNOWN_CAREER_HOSTS
            .iter()
            .find(|(host, _)| lower_url.contains(host))
            .map(|(_, name)| name.to_string())
    };

    from_url
        .filter(|c| !c.is_empty())
        .or_else(|| company_from_title(title))
}

fn company_from_title(title: &str) -> Option<String> {
    let company = if title.contains(" at ") {
        title.split(" at ").nth(1)
    } else if title.contains(" - ") {
        title.split(" - ").last()
    } else {
        None
    };

    company
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn clean_title(title: &str, company: Option<&str>) -> String {
    if let Some(company) = company {
        let suffix = format!(" - {}", company);
        if let Some(stripped) = title.strip_suffix(&suffix) {
            return stripped.trim().to_string();
        }
    }

    match title.split(" at ").next() {
        Some(head) if title.contains(" at ") => head.trim().to_string(),
        _ => title.to_string(),
    }
}

fn slug_to_name(slug: &str) -> String {
    title_case(&slug.replace('-', " "))
}

/// Compile the agent's records into unique postings. Raw hits that do not
/// look like job pages are dropped; the first record for a url wins.
pub fn compile_records(records: Vec<HandoffRecord>, extractor: &Extractor) -> Vec<JobPosting> {
    let total = records.len();
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for record in records {
        let job = match record {
            HandoffRecord::Job(job) => job,
            HandoffRecord::Search(result) => {
                if !looks_like_job(&result) {
                    debug!(url = %result.url, "Skipping non-job search result");
                    continue;
                }
                extractor.extract(&result)
            }
        };

        if job.url.trim().is_empty() || !seen.insert(job.url.clone()) {
            continue;
        }
        jobs.push(job);
    }

    info!("Compiled {} unique jobs from {} records", jobs.len(), total);
    jobs
}
