//! Synchronous HTTP API over the local crawler.
//!
//! `POST /crawl`, `POST /scrape`, `POST /links`, `GET /health`. Failures map to status codes
//! by [`ErrorKind`] and carry a `{error, detail, kind}` body.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crawlpipe_core::{
    CrawlBackend, CrawlRequest, CrawlResponse, Error, ErrorKind, HealthResponse, LinksRequest,
    LinksResponse, PageRecord, ScrapeRequest, Validate,
};
use crawlpipe_local::LocalCrawler;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    crawler: Arc<LocalCrawler>,
}

pub fn router(crawler: Arc<LocalCrawler>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/crawl", post(crawl))
        .route("/scrape", post(scrape))
        .route("/links", post(links))
        .with_state(AppState { crawler })
}

pub async fn serve(addr: &str, crawler: Arc<LocalCrawler>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        crawler = %crawler.executable().display(),
        crawler_available = crawler.is_available(),
        "crawler api listening"
    );
    axum::serve(listener, router(crawler))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self(Error::Validation(r.body_text()))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    kind: &'static str,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::EmptyResult => StatusCode::NOT_FOUND,
        ErrorKind::Executor | ErrorKind::MalformedOutput => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

fn headline(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "Validation error",
        ErrorKind::Timeout => "Crawler timed out",
        ErrorKind::Executor => "Crawler failed",
        ErrorKind::MalformedOutput => "Failed to parse crawler output",
        ErrorKind::EmptyResult => "Not found",
        ErrorKind::Upstream => "Upstream error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody {
            error: headline(kind),
            detail: self.0.message(),
            kind: kind.as_str(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        crawler_available: state.crawler.is_available(),
    })
}

async fn crawl(
    State(state): State<AppState>,
    body: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<CrawlResponse>, ApiError> {
    let Json(req) = body?;
    let req = req.validated()?;
    tracing::info!(url = %req.url, depth = req.depth, max_pages = req.max_pages, "POST /crawl");
    Ok(Json(state.crawler.crawl(&req).await?))
}

async fn scrape(
    State(state): State<AppState>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<PageRecord>, ApiError> {
    let Json(req) = body?;
    let req = req.validated()?;
    tracing::info!(url = %req.url, "POST /scrape");
    Ok(Json(state.crawler.scrape(&req).await?))
}

async fn links(
    State(state): State<AppState>,
    body: Result<Json<LinksRequest>, JsonRejection>,
) -> Result<Json<LinksResponse>, ApiError> {
    let Json(req) = body?;
    let req = req.validated()?;
    tracing::info!(url = %req.url, "POST /links");
    Ok(Json(state.crawler.links(&req).await?))
}
