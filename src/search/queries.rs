// src/search/queries.rs
use crate::core::config_manager::SearchConfig;
use crate::utils::company_slug;

/// Upper bound on queries handed to the search agent per run
pub const MAX_QUERIES: usize = 20;

pub const JOB_BOARDS: [&str; 6] = [
    "linkedin.com/jobs",
    "greenhouse.io",
    "lever.co",
    "workable.com",
    "indeed.com",
    "glassdoor.com",
];

/// Build the query list for one run: career-page queries per company, then
/// site-restricted job board queries, then industry combinations.
pub fn generate_queries(search: &SearchConfig) -> Vec<String> {
    let mut queries = Vec::new();

    for company in &search.target_companies {
        let slug = company_slug(company);
        for title in search.job_titles.iter().take(3) {
            queries.push(format!(
                "site:careers.{slug}.com OR site:jobs.{slug}.com \"{title}\""
            ));
        }
    }

    for title in search.job_titles.iter().take(5) {
        for location in search.locations.iter().take(3) {
            for board in JOB_BOARDS.iter().take(3) {
                queries.push(format!("site:{board} \"{title}\" \"{location}\""));
            }
        }
    }

    for industry in search.industries_priority.iter().take(5) {
        for title in search.job_titles.iter().take(3) {
            for location in search.locations.iter().take(2) {
                queries.push(format!("\"{title}\" \"{industry}\" \"{location}\" jobs"));
            }
        }
    }

    queries.truncate(MAX_QUERIES);
    queries
}
