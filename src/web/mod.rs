// src/web/mod.rs
//! Read-only reporting surface over the job store

pub mod dashboard;
pub mod handlers;
pub mod types;

pub use types::*;

use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::{catchers, get, options, routes, Build, Request, Response, Rocket, State};
use std::net::IpAddr;
use tracing::info;

use crate::core::JobStore;
use crate::types::{EmailLogEntry, SearchRunEntry, StoreStats, StoredJob};

pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
    }
}

#[get("/")]
pub async fn index(
    store: &State<JobStore>,
) -> Result<RawHtml<String>, Json<StandardErrorResponse>> {
    handlers::dashboard_handler(store).await
}

#[get("/health")]
pub async fn health(
    store: &State<JobStore>,
) -> Result<Json<TextResponse>, Json<StandardErrorResponse>> {
    handlers::health_handler(store).await
}

#[get("/stats")]
pub async fn stats(
    store: &State<JobStore>,
) -> Result<Json<DataResponse<StoreStats>>, Json<StandardErrorResponse>> {
    handlers::stats_handler(store).await
}

#[get("/jobs?<limit>")]
pub async fn recent_jobs(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> Result<Json<DataResponse<Vec<StoredJob>>>, Json<StandardErrorResponse>> {
    handlers::recent_jobs_handler(store, limit).await
}

#[get("/jobs/unsent?<limit>")]
pub async fn unsent_jobs(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> Result<Json<DataResponse<Vec<StoredJob>>>, Json<StandardErrorResponse>> {
    handlers::unsent_jobs_handler(store, limit).await
}

#[get("/runs?<limit>")]
pub async fn runs(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> Result<Json<DataResponse<Vec<SearchRunEntry>>>, Json<StandardErrorResponse>> {
    handlers::runs_handler(store, limit).await
}

#[get("/emails?<limit>")]
pub async fn emails(
    store: &State<JobStore>,
    limit: Option<usize>,
) -> Result<Json<DataResponse<Vec<EmailLogEntry>>>, Json<StandardErrorResponse>> {
    handlers::emails_handler(store, limit).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Not found",
        "NOT_FOUND",
        vec![
            "Available endpoints: /api/stats, /api/jobs, /api/jobs/unsent, /api/runs, /api/emails".to_string(),
        ],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error",
        "INTERNAL_ERROR",
        vec!["Check the server log".to_string()],
    ))
}

/// Assemble the server around an already opened store
pub fn build_rocket(rocket: Rocket<Build>, store: JobStore) -> Rocket<Build> {
    rocket
        .attach(Cors)
        .manage(store)
        .register("/api", catchers![not_found, internal_error])
        .mount("/", routes![index, health])
        .mount("/api", routes![stats, recent_jobs, unsent_jobs, runs, emails, options])
}

pub async fn start_dashboard(store: JobStore, address: IpAddr, port: u16) -> Result<()> {
    let figment = rocket::Config::figment()
        .merge(("address", address))
        .merge(("port", port));

    info!("Starting Job Scout dashboard on http://{}:{}", address, port);

    build_rocket(rocket::custom(figment), store)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Dashboard server failed: {}", e))?;

    Ok(())
}
