use serde::{Deserialize, Serialize};
use std::ops::{Deref, RangeInclusive};
use std::time::{Duration, Instant};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("execution exceeded {0:?}")]
    Timeout(Duration),
    #[error("crawler failed: {0}")]
    Executor(String),
    #[error("failed to parse crawler output: {0}")]
    MalformedOutput(String),
    #[error("no data returned from the page")]
    EmptyResult,
    #[error("crawler api error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable classification of an [`Error`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Timeout,
    Executor,
    MalformedOutput,
    EmptyResult,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::Timeout => "timeout",
            Self::Executor => "executor_error",
            Self::MalformedOutput => "malformed_output",
            Self::EmptyResult => "empty_result",
            Self::Upstream => "upstream_error",
        }
    }

    /// Inverse of [`ErrorKind::as_str`].
    pub fn from_code(code: &str) -> Option<Self> {
        [
            Self::Validation,
            Self::Timeout,
            Self::Executor,
            Self::MalformedOutput,
            Self::EmptyResult,
            Self::Upstream,
        ]
        .into_iter()
        .find(|k| k.as_str() == code)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Executor(_) => ErrorKind::Executor,
            Self::MalformedOutput(_) => ErrorKind::MalformedOutput,
            Self::EmptyResult => ErrorKind::EmptyResult,
            Self::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// The raw message without the kind prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(m) | Self::Executor(m) | Self::MalformedOutput(m) | Self::Upstream(m) => {
                m.clone()
            }
            Self::Timeout(_) | Self::EmptyResult => self.to_string(),
        }
    }
}

pub mod limits {
    use std::ops::RangeInclusive;

    pub const DEPTH: RangeInclusive<u32> = 0..=5;
    pub const MAX_PAGES: RangeInclusive<u32> = 1..=100;
    pub const WORKERS: RangeInclusive<u32> = 1..=10;
    pub const DELAY_S: RangeInclusive<u32> = 0..=10;
    pub const TIMEOUT_S: RangeInclusive<u32> = 5..=60;
}

mod defaults {
    pub fn depth() -> u32 {
        1
    }
    pub fn max_pages() -> u32 {
        20
    }
    pub fn workers() -> u32 {
        2
    }
    pub fn stay_domain() -> bool {
        true
    }
    pub fn delay() -> u32 {
        1
    }
    pub fn timeout() -> u32 {
        10
    }
}

/// Full-control crawl request. Omitted fields take the crawler's documented defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(default)]
    pub extract_links: bool,
    #[serde(default = "defaults::depth")]
    pub depth: u32,
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,
    #[serde(default = "defaults::workers")]
    pub workers: u32,
    #[serde(default = "defaults::stay_domain")]
    pub stay_domain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub seed_only: bool,
    #[serde(default)]
    pub news: bool,
    /// Delay between requests, in seconds.
    #[serde(default = "defaults::delay")]
    pub delay: u32,
    /// Per-request timeout, in seconds.
    #[serde(default = "defaults::timeout")]
    pub timeout: u32,
    #[serde(default)]
    pub verbose: bool,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extract_links: false,
            depth: defaults::depth(),
            max_pages: defaults::max_pages(),
            workers: defaults::workers(),
            stay_domain: defaults::stay_domain(),
            filter: None,
            seed_only: false,
            news: false,
            delay: defaults::delay(),
            timeout: defaults::timeout(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub extract_links: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksRequest {
    pub url: String,
}

/// A value that passed [`Validate::validate`]. Only this crate can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valid<T>(T);

impl<T> Valid<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Valid<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

pub trait Validate: Sized {
    fn validate(&self) -> Result<()>;

    fn validated(self) -> Result<Valid<Self>> {
        self.validate()?;
        Ok(Valid(self))
    }
}

pub fn validate_url(raw: &str) -> Result<()> {
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(Error::Validation(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    let parsed =
        url::Url::parse(raw).map_err(|e| Error::Validation(format!("invalid URL {raw}: {e}")))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::Validation(format!("invalid URL {raw}: missing host")));
    }
    Ok(())
}

fn check_range(field: &str, value: u32, range: RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

impl Validate for CrawlRequest {
    fn validate(&self) -> Result<()> {
        validate_url(&self.url)?;
        check_range("depth", self.depth, limits::DEPTH)?;
        check_range("max_pages", self.max_pages, limits::MAX_PAGES)?;
        check_range("workers", self.workers, limits::WORKERS)?;
        check_range("delay", self.delay, limits::DELAY_S)?;
        check_range("timeout", self.timeout, limits::TIMEOUT_S)?;
        Ok(())
    }
}

impl Validate for ScrapeRequest {
    fn validate(&self) -> Result<()> {
        validate_url(&self.url)
    }
}

impl Validate for LinksRequest {
    fn validate(&self) -> Result<()> {
        validate_url(&self.url)
    }
}

impl Valid<ScrapeRequest> {
    /// Seed-only, single-page crawl for the scrape operation.
    pub fn single_page(&self) -> Valid<CrawlRequest> {
        Valid(CrawlRequest {
            extract_links: self.extract_links,
            seed_only: true,
            max_pages: 1,
            ..CrawlRequest::new(self.url.clone())
        })
    }
}

impl Valid<LinksRequest> {
    /// Seed-only, single-page crawl with link extraction.
    pub fn single_page(&self) -> Valid<CrawlRequest> {
        Valid(CrawlRequest {
            extract_links: true,
            seed_only: true,
            max_pages: 1,
            ..CrawlRequest::new(self.url.clone())
        })
    }
}

/// One page as written by the crawler executable. Re-serialized unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    pub crawled_at: String,
    pub depth: u32,
}

/// Successful orchestration result.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub pages: Vec<PageRecord>,
    pub elapsed: Duration,
}

pub type ExecutionOutcome = Result<Execution>;

impl Execution {
    /// Enforce the request's page contract: at most one page in seed-only mode,
    /// never more than `max_pages`.
    pub fn capped_for(mut self, req: &CrawlRequest) -> Self {
        let cap = if req.seed_only { 1 } else { req.max_pages as usize };
        self.pages.truncate(cap);
        self
    }

    pub fn into_first_page(self) -> Result<PageRecord> {
        self.pages.into_iter().next().ok_or(Error::EmptyResult)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub pages_crawled: usize,
    pub pages: Vec<PageRecord>,
    pub execution_time_seconds: f64,
}

impl From<Execution> for CrawlResponse {
    fn from(ex: Execution) -> Self {
        Self {
            pages_crawled: ex.pages.len(),
            execution_time_seconds: ex.elapsed.as_secs_f64(),
            pages: ex.pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksResponse {
    pub url: String,
    pub links_found: usize,
    pub links: Vec<String>,
}

impl LinksResponse {
    pub fn from_page(requested_url: &str, page: PageRecord) -> Self {
        let links = page.links.unwrap_or_default();
        Self {
            url: requested_url.to_string(),
            links_found: links.len(),
            links,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub crawler_available: bool,
}

pub const DEFAULT_TIMEOUT_SLACK: Duration = Duration::from_secs(30);
pub const DEFAULT_SINGLE_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an orchestration call may run before the crawler is killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Added to every crawl budget for process startup and output IO.
    pub slack: Duration,
    /// Fixed budget for scrape and links.
    pub single_page: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            slack: DEFAULT_TIMEOUT_SLACK,
            single_page: DEFAULT_SINGLE_PAGE_TIMEOUT,
        }
    }
}

impl TimeoutPolicy {
    /// `timeout × max_pages + slack`: worst case of every page hitting its own timeout.
    pub fn crawl_budget(&self, req: &CrawlRequest) -> Duration {
        let worst_case_s = u64::from(req.timeout).saturating_mul(u64::from(req.max_pages));
        Duration::from_secs(worst_case_s).saturating_add(self.slack)
    }
}

/// A time budget pinned to the instant it runs out.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    budget: Duration,
    expires_at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            budget,
            expires_at: Instant::now() + budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// One way of carrying out the tool catalog's operations.
///
/// Implementations either drive the crawler executable directly or relay to a
/// remote instance of the HTTP API; front-ends hold an `Arc<dyn CrawlBackend>`
/// and never care which.
#[async_trait::async_trait]
pub trait CrawlBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn crawl(&self, req: &Valid<CrawlRequest>) -> Result<CrawlResponse>;
    async fn scrape(&self, req: &Valid<ScrapeRequest>) -> Result<PageRecord>;
    async fn links(&self, req: &Valid<LinksRequest>) -> Result<LinksResponse>;
}
