// src/digest/formatter.rs
use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::types::JobPosting;
use crate::utils::escape_html;

pub const HIGH_MATCH_MIN: i64 = 15;
pub const GOOD_MATCH_MIN: i64 = 10;
/// Denominator shown next to every score
pub const SCORE_SCALE: i64 = 20;

const ACCENT: &str = "#4A90E2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    High,
    Good,
    Potential,
}

impl MatchTier {
    pub fn for_score(score: i64) -> Self {
        if score >= HIGH_MATCH_MIN {
            Self::High
        } else if score >= GOOD_MATCH_MIN {
            Self::Good
        } else {
            Self::Potential
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::High => "🌟",
            Self::Good => "⭐",
            Self::Potential => "✨",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High Match",
            Self::Good => "Good Match",
            Self::Potential => "Potential Match",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::High => "#4CAF50",
            Self::Good => "#FF9800",
            Self::Potential => "#2196F3",
        }
    }
}

/// Plain-text and HTML renderings of one digest
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDigest {
    pub subject: String,
    pub text: String,
    pub html: String,
    /// Urls of the jobs that made it into the message, in rank order
    pub included: Vec<String>,
}

pub struct DigestFormatter {
    title: String,
}

impl DigestFormatter {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }

    pub fn subject(&self, shown: usize, date: DateTime<Utc>) -> String {
        format!(
            "🔎 {} - {} - Top {} Matches",
            self.title,
            date.format("%b %d"),
            shown
        )
    }

    /// Render the first `count` jobs, which are expected best first.
    /// Returns `None` when there is nothing to send.
    pub fn format(&self, jobs: &[JobPosting], count: usize) -> Option<RenderedDigest> {
        self.format_at(jobs, count, Utc::now())
    }

    pub fn format_at(
        &self,
        jobs: &[JobPosting],
        count: usize,
        date: DateTime<Utc>,
    ) -> Option<RenderedDigest> {
        if jobs.is_empty() || count == 0 {
            return None;
        }

        let top = &jobs[..count.min(jobs.len())];
        Some(RenderedDigest {
            subject: self.subject(top.len(), date),
            text: self.render_text(top, jobs.len()),
            html: self.render_html(top, jobs.len()),
            included: top.iter().map(|j| j.url.clone()).collect(),
        })
    }

    fn render_text(&self, top: &[JobPosting], total: usize) -> String {
        let mut text = format!("{} - {} Top Matches\n\n", self.title, top.len());

        for (i, job) in top.iter().enumerate() {
            let tier = MatchTier::for_score(job.score);
            let _ = writeln!(text, "{} {}. {}", tier.emoji(), i + 1, job.title);
            let _ = writeln!(
                text,
                "Score: {}/{} ({})",
                job.score,
                SCORE_SCALE,
                tier.label()
            );
            let _ = writeln!(text, "Company: {}", job.company);
            let _ = writeln!(text, "Location: {}", job.location);
            if let Some(salary) = &job.salary {
                let _ = writeln!(text, "Salary: {}", salary);
            }
            if !job.source.is_empty() {
                let _ = writeln!(text, "Source: {}", job.source);
            }
            let _ = writeln!(text, "Link: {}\n", job.url);
        }

        let _ = writeln!(text, "\nFound {} jobs this round.", total);
        text
    }

    fn render_html(&self, top: &[JobPosting], total: usize) -> String {
        let mut html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: {ACCENT};">🔎 {} - {} Top Matches</h2>
  <p>Here are the latest job matches based on your criteria:</p>
"#,
            escape_html(&self.title),
            top.len()
        );

        for (i, job) in top.iter().enumerate() {
            let tier = MatchTier::for_score(job.score);
            let _ = write!(
                html,
                r#"  <div style="border-left: 3px solid {ACCENT}; padding-left: 15px; margin: 20px 0;">
    <h3 style="margin: 5px 0;">{} {}. {}</h3>
    <p style="margin: 10px 0 15px 0;">
      <span style="background-color: {}; color: white; padding: 6px 12px; border-radius: 4px; font-weight: bold; font-size: 14px;">Score: {}/{} · {}</span>
    </p>
    <p style="margin: 5px 0;"><strong>🏢 Company:</strong> {}</p>
    <p style="margin: 5px 0;"><strong>📍 Location:</strong> {}</p>
"#,
                tier.emoji(),
                i + 1,
                escape_html(&job.title),
                tier.color(),
                job.score,
                SCORE_SCALE,
                tier.label(),
                escape_html(&job.company),
                escape_html(&job.location),
            );

            if let Some(salary) = &job.salary {
                let _ = writeln!(
                    html,
                    r#"    <p style="margin: 5px 0;"><strong>💰 Salary:</strong> {}</p>"#,
                    escape_html(salary)
                );
            }
            if !job.source.is_empty() {
                let _ = writeln!(
                    html,
                    r#"    <p style="margin: 5px 0; color: #666; font-size: 13px;"><strong>📌 Source:</strong> {}</p>"#,
                    escape_html(&job.source)
                );
            }
            let _ = write!(
                html,
                r#"    <p style="margin: 5px 0;"><a href="{}" style="color: {ACCENT}; text-decoration: none;">🔗 View Details →</a></p>
  </div>
"#,
                escape_html(&job.url)
            );
        }

        let _ = write!(
            html,
            r#"  <hr style="border: none; border-top: 1px solid #ddd; margin: 20px 0;">
  <p style="color: #888; font-size: 12px;">Found {} jobs this round.</p>
</div>
"#,
            total
        );
        html
    }
}
