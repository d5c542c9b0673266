use crawlpipe_core::{
    CrawlBackend, CrawlRequest, CrawlResponse, Deadline, ExecutionOutcome, LinksRequest,
    LinksResponse, PageRecord, Result, ScrapeRequest, TimeoutPolicy, Valid,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod args;
pub mod interpret;
pub mod locate;
pub mod relay;
pub mod runner;
#[cfg(all(unix, any(test, feature = "test-util")))]
pub mod testutil;

pub use relay::RelayCrawler;

/// Drives the crawler executable as a child process, one process per call.
#[derive(Debug, Clone)]
pub struct LocalCrawler {
    executable: PathBuf,
    policy: TimeoutPolicy,
}

impl LocalCrawler {
    pub fn new(executable: impl Into<PathBuf>, policy: TimeoutPolicy) -> Self {
        Self {
            executable: executable.into(),
            policy,
        }
    }

    /// Resolve a configured name or path (see [`locate::resolve`]) and build a crawler for it.
    pub fn from_config(configured: &Path, policy: TimeoutPolicy) -> Self {
        let executable = locate::resolve(configured);
        tracing::debug!(executable = %executable.display(), "resolved crawler executable");
        Self::new(executable, policy)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    pub fn is_available(&self) -> bool {
        locate::is_available(&self.executable)
    }

    /// Compile, run within `budget`, interpret. Results never exceed the request's page cap.
    pub async fn execute(&self, req: &Valid<CrawlRequest>, budget: Duration) -> ExecutionOutcome {
        let tokens = args::compile(req);
        let report = runner::run(&self.executable, &tokens, Deadline::after(budget)).await?;
        let outcome = interpret::interpret(report).map(|ex| ex.capped_for(req));
        match &outcome {
            Ok(ex) => tracing::info!(url = %req.url, pages = ex.pages.len(), "crawl succeeded"),
            Err(e) => tracing::warn!(url = %req.url, kind = e.kind().as_str(), error = %e, "crawl failed"),
        }
        outcome
    }
}

#[async_trait::async_trait]
impl CrawlBackend for LocalCrawler {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn crawl(&self, req: &Valid<CrawlRequest>) -> Result<CrawlResponse> {
        let ex = self.execute(req, self.policy.crawl_budget(req)).await?;
        Ok(ex.into())
    }

    async fn scrape(&self, req: &Valid<ScrapeRequest>) -> Result<PageRecord> {
        self.execute(&req.single_page(), self.policy.single_page)
            .await?
            .into_first_page()
    }

    async fn links(&self, req: &Valid<LinksRequest>) -> Result<LinksResponse> {
        let page = self
            .execute(&req.single_page(), self.policy.single_page)
            .await?
            .into_first_page()?;
        Ok(LinksResponse::from_page(&req.url, page))
    }
}
