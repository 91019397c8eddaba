// src/web/dashboard.rs
use std::fmt::Write;

use crate::digest::MatchTier;
use crate::types::{StoreStats, StoredJob};
use crate::utils::escape_html;

const STYLE: &str = r#"
  body { font-family: Arial, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; background: #f5f5f5; }
  h1 { color: #4A90E2; }
  .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin: 20px 0; }
  .stat-card, .panel { background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
  .panel { margin: 20px 0; }
  .stat-number { font-size: 32px; font-weight: bold; color: #4A90E2; }
  .stat-label { color: #666; margin-top: 5px; }
  table { width: 100%; border-collapse: collapse; }
  th { text-align: left; padding: 12px; background: #4A90E2; color: white; }
  td { padding: 12px; border-bottom: 1px solid #ddd; }
  tr:hover { background: #f9f9f9; }
  .score, .badge { padding: 4px 8px; border-radius: 4px; color: white; }
  .score { font-weight: bold; }
  .badge { font-size: 12px; }
  .score-high, .badge-sent { background: #4CAF50; }
  .score-medium, .badge-pending { background: #FF9800; }
  .score-low { background: #2196F3; }
  a { color: #4A90E2; text-decoration: none; }
  a:hover { text-decoration: underline; }
"#;

fn score_class(score: i64) -> &'static str {
    match MatchTier::for_score(score) {
        MatchTier::High => "score-high",
        MatchTier::Good => "score-medium",
        MatchTier::Potential => "score-low",
    }
}

fn stat_card(html: &mut String, value: i64, label: &str) {
    let _ = write!(
        html,
        r#"<div class="stat-card"><div class="stat-number">{}</div><div class="stat-label">{}</div></div>"#,
        value, label
    );
}

pub fn render_dashboard(stats: &StoreStats, jobs: &[StoredJob]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Job Scout Dashboard</title>\n<style>{}</style>\n</head>\n<body>\n<h1>Job Scout Dashboard</h1>\n<div class=\"stats\">",
        STYLE
    );

    stat_card(&mut html, stats.total_jobs, "Total Jobs");
    stat_card(&mut html, stats.unsent_jobs, "Unsent Jobs");
    stat_card(&mut html, stats.sent_jobs, "Sent Jobs");
    stat_card(&mut html, stats.total_emails, "Emails Sent");
    html.push_str("</div>\n");

    if let Some(run) = &stats.last_run {
        let _ = write!(
            html,
            r#"<div class="panel"><h2>Last Search Run</h2>
<p><strong>Date:</strong> {}</p>
<p><strong>Found:</strong> {} jobs</p>
<p><strong>Validated:</strong> {} jobs</p>
<p><strong>New:</strong> {} jobs</p>
<p><strong>Status:</strong> {}</p></div>
"#,
            run.run_date.format("%Y-%m-%d %H:%M UTC"),
            run.jobs_found,
            run.jobs_validated,
            run.jobs_new,
            if run.success { "Succeeded" } else { "Failed" }
        );
    }

    let _ = write!(
        html,
        r#"<div class="panel"><h2>Recent Jobs (Last {})</h2>
<table><thead><tr><th>Score</th><th>Title</th><th>Company</th><th>Location</th><th>Status</th><th>Found</th></tr></thead><tbody>
"#,
        jobs.len()
    );

    for job in jobs {
        let status = if job.sent {
            r#"<span class="badge badge-sent">✓ Sent</span>"#
        } else {
            r#"<span class="badge badge-pending">Pending</span>"#
        };
        let _ = writeln!(
            html,
            r#"<tr><td><span class="score {}">{}</span></td><td><a href="{}" target="_blank">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            score_class(job.score),
            job.score,
            escape_html(&job.url),
            escape_html(&job.title),
            escape_html(&job.company),
            escape_html(&job.location),
            status,
            job.first_seen.format("%Y-%m-%d")
        );
    }

    html.push_str("</tbody></table></div>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_dashboard_escapes_and_badges() {
        let now = Utc::now();
        let stats = StoreStats {
            total_jobs: 2,
            sent_jobs: 1,
            unsent_jobs: 1,
            total_emails: 3,
            last_run: None,
        };
        let job = StoredJob {
            url: "https://x.test/1".to_string(),
            title: "<script>alert(1)</script>".to_string(),
            company: "Acme".to_string(),
            location: "Venice, CA".to_string(),
            salary: None,
            score: 16,
            source: String::new(),
            first_seen: now,
            last_seen: now,
            sent: true,
            sent_date: Some(now),
            raw_data: None,
        };

        let html = render_dashboard(&stats, &[job]);
        assert!(html.contains("score-high"));
        assert!(html.contains("✓ Sent"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Last Search Run"));
    }
}
