// src/web/handlers.rs
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

use super::dashboard::render_dashboard;
use super::types::*;
use crate::core::JobStore;
use crate::types::{EmailLogEntry, SearchRunEntry, StoreStats, StoredJob};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

type ApiResult<T> = Result<Json<DataResponse<T>>, Json<StandardErrorResponse>>;

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn database_error(context: &str, e: anyhow::Error) -> Json<StandardErrorResponse> {
    error!("{}: {:#}", context, e);
    Json(StandardErrorResponse::database(&e))
}

pub async fn dashboard_handler(
    store: &State<JobStore>,
) -> Result<RawHtml<String>, Json<StandardErrorResponse>> {
    let stats = store
        .stats()
        .await
        .map_err(|e| database_error("Failed to load stats", e))?;
    let jobs = store
        .list_recent(DEFAULT_LIMIT)
        .await
        .map_err(|e| database_error("Failed to load recent jobs", e))?;

    Ok(RawHtml(render_dashboard(&stats, &jobs)))
}

pub async fn stats_handler(store: &State<JobStore>) -> ApiResult<StoreStats> {
    let stats = store
        .stats()
        .await
        .map_err(|e| database_error("Failed to load stats", e))?;

    Ok(Json(DataResponse::new(
        format!("{} jobs, {} unsent", stats.total_jobs, stats.unsent_jobs),
        stats,
    )))
}

pub async fn recent_jobs_handler(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> ApiResult<Vec<StoredJob>> {
    let jobs = store
        .list_recent(clamp_limit(limit))
        .await
        .map_err(|e| database_error("Failed to load recent jobs", e))?;

    info!("Serving {} recent jobs", jobs.len());
    Ok(Json(DataResponse::new(format!("{} jobs", jobs.len()), jobs)))
}

pub async fn unsent_jobs_handler(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> ApiResult<Vec<StoredJob>> {
    let jobs = store
        .list_unsent(Some(clamp_limit(limit)))
        .await
        .map_err(|e| database_error("Failed to load unsent jobs", e))?;

    Ok(Json(DataResponse::new(
        format!("{} unsent jobs", jobs.len()),
        jobs,
    )))
}

pub async fn runs_handler(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> ApiResult<Vec<SearchRunEntry>> {
    let runs = store
        .recent_runs(clamp_limit(limit))
        .await
        .map_err(|e| database_error("Failed to load search runs", e))?;

    Ok(Json(DataResponse::new(format!("{} runs", runs.len()), runs)))
}

pub async fn emails_handler(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> ApiResult<Vec<EmailLogEntry>> {
    let emails = store
        .recent_emails(clamp_limit(limit))
        .await
        .map_err(|e| database_error("Failed to load email log", e))?;

    Ok(Json(DataResponse::new(
        format!("{} email attempts", emails.len()),
        emails,
    )))
}

pub async fn health_handler(
    store: &State<JobStore>,
) -> Result<Json<TextResponse>, Json<StandardErrorResponse>> {
    store
        .health_check()
        .await
        .map_err(|e| database_error("Health check failed", e))?;

    Ok(Json(TextResponse::ok("Job Scout dashboard is running")))
}
