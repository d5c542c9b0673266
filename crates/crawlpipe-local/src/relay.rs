use crawlpipe_core::{
    CrawlBackend, CrawlRequest, CrawlResponse, Error, ErrorKind, LinksRequest, LinksResponse,
    PageRecord, Result, ScrapeRequest, TimeoutPolicy, Valid,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Extra wait on top of the API's own budget for every relayed call.
pub const DEFAULT_RELAY_MARGIN: Duration = Duration::from_secs(30);

/// Backend that forwards every operation to a remote crawlpipe HTTP API.
///
/// Each call waits for the API's budget for that request (computed from `policy`,
/// which should match the API's) plus `margin`, so the API always gives up first.
#[derive(Debug, Clone)]
pub struct RelayCrawler {
    client: reqwest::Client,
    base_url: String,
    policy: TimeoutPolicy,
    margin: Duration,
}

impl RelayCrawler {
    pub fn new(base_url: &str, policy: TimeoutPolicy, margin: Duration) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| Error::Validation(format!("invalid crawler API url {base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("crawlpipe-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            policy,
            margin,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// How long a relayed `/crawl` may take.
    pub fn crawl_timeout(&self, req: &CrawlRequest) -> Duration {
        self.policy.crawl_budget(req).saturating_add(self.margin)
    }

    /// How long a relayed `/scrape` or `/links` may take.
    pub fn single_page_timeout(&self) -> Duration {
        self.policy.single_page.saturating_add(self.margin)
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B, api_budget: Duration) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.base_url);
        let limit = api_budget.saturating_add(self.margin);
        tracing::debug!(%url, timeout_ms = limit.as_millis() as u64, "relaying to crawler api");
        let resp = self
            .client
            .post(&url)
            .timeout(limit)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, limit))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let err = error_from_status(status, &text, api_budget);
            tracing::warn!(%url, %status, kind = err.kind().as_str(), "crawler api returned an error");
            return Err(err);
        }
        resp.json::<R>().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(limit)
            } else {
                Error::Upstream(format!("undecodable response from {url}: {e}"))
            }
        })
    }
}

fn transport_error(e: reqwest::Error, limit: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout(limit)
    } else {
        Error::Upstream(format!("failed to call crawler api: {e}"))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Rebuild the API's error from its body; the status code decides only when `kind` is missing.
fn error_from_status(status: reqwest::StatusCode, body: &str, api_budget: Duration) -> Error {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let kind = parsed
        .as_ref()
        .and_then(|b| b.kind.as_deref())
        .and_then(ErrorKind::from_code);
    let detail = parsed
        .and_then(|b| b.detail.or(b.error))
        .unwrap_or_else(|| body.trim().to_string());
    match kind {
        Some(ErrorKind::Validation) => Error::Validation(detail),
        Some(ErrorKind::Timeout) => Error::Timeout(api_budget),
        Some(ErrorKind::Executor) => Error::Executor(detail),
        Some(ErrorKind::MalformedOutput) => Error::MalformedOutput(detail),
        Some(ErrorKind::EmptyResult) => Error::EmptyResult,
        Some(ErrorKind::Upstream) => Error::Upstream(format!("HTTP {status}: {detail}")),
        None => match status.as_u16() {
            400 | 422 => Error::Validation(detail),
            404 => Error::EmptyResult,
            _ => Error::Upstream(format!("HTTP {status}: {detail}")),
        },
    }
}

#[async_trait::async_trait]
impl CrawlBackend for RelayCrawler {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn crawl(&self, req: &Valid<CrawlRequest>) -> Result<CrawlResponse> {
        self.post("/crawl", &**req, self.policy.crawl_budget(req)).await
    }

    async fn scrape(&self, req: &Valid<ScrapeRequest>) -> Result<PageRecord> {
        self.post("/scrape", &**req, self.policy.single_page).await
    }

    async fn links(&self, req: &Valid<LinksRequest>) -> Result<LinksResponse> {
        self.post("/links", &**req, self.policy.single_page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use crawlpipe_core::{limits, Validate};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("axum serve");
        });
        format!("http://{addr}")
    }

    fn relay(base: &str) -> RelayCrawler {
        RelayCrawler::new(base, TimeoutPolicy::default(), DEFAULT_RELAY_MARGIN).unwrap()
    }

    fn scrape_req() -> Valid<ScrapeRequest> {
        ScrapeRequest {
            url: "https://example.com".to_string(),
            extract_links: false,
        }
        .validated()
        .unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(relay("http://localhost:8080/").base_url(), "http://localhost:8080");
        assert!(RelayCrawler::new("not a url", TimeoutPolicy::default(), DEFAULT_RELAY_MARGIN).is_err());
    }

    #[test]
    fn relay_outlasts_the_api_for_every_request() {
        let r = relay(DEFAULT_API_URL);
        let policy = TimeoutPolicy::default();
        let largest = CrawlRequest {
            timeout: *limits::TIMEOUT_S.end(),
            max_pages: *limits::MAX_PAGES.end(),
            ..CrawlRequest::new("https://example.com")
        };
        assert_eq!(policy.crawl_budget(&largest), Duration::from_secs(6030));
        assert!(r.crawl_timeout(&largest) > policy.crawl_budget(&largest));

        let defaults = CrawlRequest::new("https://example.com");
        assert!(r.crawl_timeout(&defaults) > policy.crawl_budget(&defaults));
        assert!(r.single_page_timeout() > policy.single_page);
    }

    #[test]
    fn error_kind_survives_the_hop() {
        let budget = Duration::from_secs(30);
        let e = error_from_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Crawler failed","detail":"connection refused","kind":"executor_error"}"#,
            budget,
        );
        assert!(matches!(e, Error::Executor(ref m) if m == "connection refused"));

        let e = error_from_status(
            reqwest::StatusCode::GATEWAY_TIMEOUT,
            r#"{"error":"Crawler timed out","detail":"execution exceeded 30s","kind":"timeout"}"#,
            budget,
        );
        assert!(matches!(e, Error::Timeout(d) if d == budget));

        let e = error_from_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Failed to parse crawler output","detail":"expected value","kind":"malformed_output"}"#,
            budget,
        );
        assert_eq!(e.kind(), ErrorKind::MalformedOutput);

        let e = error_from_status(
            reqwest::StatusCode::BAD_GATEWAY,
            r#"{"error":"Upstream error","detail":"boom","kind":"upstream_error"}"#,
            budget,
        );
        assert_eq!(e.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn status_decides_without_a_kind() {
        let budget = Duration::from_secs(30);
        let e = error_from_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":"depth must be between 0 and 5, got 9"}"#,
            budget,
        );
        assert!(matches!(e, Error::Validation(ref m) if m.starts_with("depth")));

        let e = error_from_status(reqwest::StatusCode::NOT_FOUND, "", budget);
        assert_eq!(e.kind(), ErrorKind::EmptyResult);

        let e = error_from_status(reqwest::StatusCode::BAD_GATEWAY, "plain text body", budget);
        assert_eq!(e.kind(), ErrorKind::Upstream);
        assert!(e.message().contains("plain text body"));

        let e = error_from_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail":"odd","kind":"not_a_kind"}"#,
            budget,
        );
        assert_eq!(e.kind(), ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn forwards_request_body_and_decodes_success() {
        let app = Router::new().route(
            "/scrape",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "url": body["url"],
                    "title": "Example",
                    "description": "",
                    "crawled_at": "2024-01-01T00:00:00Z",
                    "depth": 0
                }))
            }),
        );
        let base = serve(app).await;
        let page = relay(&base).scrape(&scrape_req()).await.expect("scrape");
        assert_eq!(page.url, "https://example.com");
        assert_eq!(page.title, "Example");
    }

    #[tokio::test]
    async fn upstream_not_found_becomes_empty_result() {
        let app = Router::new().route(
            "/scrape",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error":"Not found","detail":"no data returned from the page","kind":"empty_result"})),
                )
            }),
        );
        let base = serve(app).await;
        let err = relay(&base).scrape(&scrape_req()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
    }

    #[tokio::test]
    async fn silent_upstream_times_out_after_budget_plus_margin() {
        let app = Router::new().route(
            "/scrape",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let base = serve(app).await;
        let policy = TimeoutPolicy {
            single_page: Duration::from_millis(100),
            ..TimeoutPolicy::default()
        };
        let r = RelayCrawler::new(&base, policy, Duration::from_millis(100)).unwrap();
        let err = r.scrape(&scrape_req()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn connection_failure_is_upstream_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = relay(&format!("http://{addr}")).scrape(&scrape_req()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.message().starts_with("failed to call crawler api"));
    }
}
