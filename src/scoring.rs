// src/scoring.rs
//! Weighted keyword rubric that ranks candidate postings.

use tracing::debug;

use crate::core::config_manager::{AppConfig, ScoringWeights};
use crate::types::JobPosting;
use crate::utils::normalize_keywords;

/// Bonus keywords for creative-industry employers
pub const CREATIVE_KEYWORDS: [&str; 7] = [
    "creative",
    "design",
    "studio",
    "art",
    "film",
    "tv",
    "entertainment",
];

/// Subtracted once per configured exclusion keyword found in the text
pub const EXCLUDE_PENALTY: i64 = 10;

pub struct Scorer {
    weights: ScoringWeights,
    locations: Vec<String>,
    titles: Vec<String>,
    companies: Vec<String>,
    industries: Vec<String>,
    excludes: Vec<String>,
}

impl Scorer {
    pub fn new(config: &AppConfig) -> Self {
        let search = &config.search;
        Self {
            weights: config.scoring.clone(),
            locations: normalize_keywords(&search.locations),
            titles: normalize_keywords(&search.job_titles),
            companies: normalize_keywords(&search.target_companies),
            industries: normalize_keywords(&search.industries_priority),
            excludes: normalize_keywords(&search.exclude_keywords),
        }
    }

    /// Score a posting. Each positive category pays out at most once;
    /// every configured exclusion that appears costs `EXCLUDE_PENALTY`.
    pub fn score(&self, job: &JobPosting) -> i64 {
        let title = job.title.to_lowercase();
        let company = job.company.to_lowercase();
        let location = job.location.to_lowercase();
        let combined = format!("{} {}", title, company);

        let mut score = 0;

        if contains_any(&location, &self.locations) {
            score += self.weights.location_match;
        }
        if contains_any(&title, &self.titles) {
            score += self.weights.title_match;
        }
        if contains_any(&company, &self.companies) {
            score += self.weights.company_match;
        }
        if contains_any(&combined, &self.industries) {
            score += self.weights.industry_match;
        }
        if CREATIVE_KEYWORDS.iter().any(|k| combined.contains(k)) {
            score += self.weights.creative_industry;
        }

        let excluded = self
            .excludes
            .iter()
            .filter(|k| combined.contains(k.as_str()))
            .count() as i64;
        score -= excluded * EXCLUDE_PENALTY;

        score.max(0)
    }

    /// Assign scores and order best first. Equal scores keep their input order.
    pub fn rank(&self, mut jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        for job in jobs.iter_mut() {
            job.score = self.score(job);
        }
        jobs.sort_by(|a, b| b.score.cmp(&a.score));

        debug!(
            "Ranked {} jobs, top score {}",
            jobs.len(),
            jobs.first().map(|j| j.score).unwrap_or(0)
        );
        jobs
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    !haystack.is_empty() && needles.iter().any(|n| haystack.contains(n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(exclude: &[&str]) -> AppConfig {
        let mut config = AppConfig::from_yaml_str(
            r#"
search:
  target_companies: [Acme]
  job_titles: [Engineer]
email:
  from: scout@agentmail.to
"#,
        )
        .expect("config parses");
        config.search.exclude_keywords = exclude.iter().map(|s| s.to_string()).collect();
        config
    }

    #[test]
    fn test_title_company_and_creative_bonus() {
        let scorer = Scorer::new(&config(&[]));
        let job = JobPosting::new("https://x.test/1", "Senior Engineer", "Acme Studio", "Los Angeles, CA");
        assert_eq!(scorer.score(&job), 13);
    }

    #[test]
    fn test_no_match_scores_zero() {
        let scorer = Scorer::new(&config(&[]));
        let job = JobPosting::new("https://x.test/2", "Accountant", "Globex", "Boston, MA");
        assert_eq!(scorer.score(&job), 0);
        assert_eq!(scorer.score(&JobPosting::new("https://x.test/3", "", "", "")), 0);
    }

    #[test]
    fn test_categories_pay_out_once() {
        let mut cfg = config(&[]);
        cfg.search.job_titles = vec!["engineer".into(), "senior".into()];
        let scorer = Scorer::new(&cfg);
        let job = JobPosting::new("https://x.test/4", "Senior Engineer", "Globex", "");
        assert_eq!(scorer.score(&job), 5);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let scorer = Scorer::new(&config(&["intern"]));
        let job = JobPosting::new("https://x.test/5", "Design Engineer", "Acme", "Remote");
        assert_eq!(scorer.score(&job), scorer.score(&job));
    }

    #[test]
    fn test_repeated_exclusion_text_penalizes_once() {
        let mut cfg = config(&["unpaid"]);
        cfg.search.job_titles = vec!["intern".into()];
        let scorer = Scorer::new(&cfg);
        let job = JobPosting::new("https://x.test/6", "unpaid unpaid intern", "Acme Studio", "");
        // title 5 + company 5 + creative 3 - one penalty
        assert_eq!(scorer.score(&job), 3);
    }

    #[test]
    fn test_duplicate_exclusion_entries_stack_and_clamp() {
        let mut cfg = config(&["unpaid", "unpaid"]);
        cfg.search.job_titles = vec!["intern".into()];
        let scorer = Scorer::new(&cfg);
        let job = JobPosting::new("https://x.test/7", "unpaid intern", "Acme Studio", "");
        assert_eq!(scorer.score(&job), 0);

        let mut wide = config(&["unpaid", "volunteer"]);
        wide.scoring.title_match = 25;
        wide.search.job_titles = vec!["intern".into()];
        let job = JobPosting::new("https://x.test/8", "unpaid volunteer intern", "Globex", "");
        assert_eq!(Scorer::new(&wide).score(&job), 5);
    }

    #[test]
    fn test_empty_keywords_are_ignored() {
        let mut cfg = config(&[""]);
        cfg.search.locations = vec!["".into()];
        let scorer = Scorer::new(&cfg);
        let job = JobPosting::new("https://x.test/9", "Accountant", "Globex", "Anywhere");
        assert_eq!(scorer.score(&job), 0);
    }

    #[test]
    fn test_rank_is_stable_and_descending() {
        let scorer = Scorer::new(&config(&[]));
        let jobs = vec![
            JobPosting::new("https://x.test/a", "Accountant", "Globex", ""),
            JobPosting::new("https://x.test/b", "Engineer", "Acme", ""),
            JobPosting::new("https://x.test/c", "Clerk", "Initech", ""),
        ];

        let ranked = scorer.rank(jobs);
        let urls: Vec<_> = ranked.iter().map(|j| j.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.test/b", "https://x.test/a", "https://x.test/c"]);
        assert_eq!(ranked[0].score, 10);
    }
}
