//! MCP tool catalog: `crawl_website`, `quick_scrape`, `get_page_links`.
//!
//! The same [`CrawlerMcp`] serves stdio (local backend) and streamable HTTP (relay backend).
//! Domain failures come back as text content, see [`envelope`].

mod envelope;

use crawlpipe_core::{CrawlBackend, CrawlRequest, LinksRequest, ScrapeRequest, Validate};
use envelope::Action;
use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::stdio,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CrawlWebsiteArgs {
    /// Starting URL (must start with http:// or https://).
    pub url: String,
    /// Extract links found on each page (default false).
    #[serde(default)]
    pub extract_links: Option<bool>,
    /// Maximum crawl depth, 0-5 (default 1).
    #[serde(default)]
    #[schemars(range(min = 0, max = 5))]
    pub depth: Option<u32>,
    /// Maximum number of pages to crawl, 1-100 (default 20).
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub max_pages: Option<u32>,
    /// Concurrent crawler workers, 1-10 (default 2).
    #[serde(default)]
    #[schemars(range(min = 1, max = 10))]
    pub workers: Option<u32>,
    /// Only follow links on the seed's domain (default true).
    #[serde(default)]
    pub stay_domain: Option<bool>,
    /// Only crawl URLs containing this substring.
    #[serde(default)]
    pub filter: Option<String>,
    /// Crawl only the seed URL (default false).
    #[serde(default)]
    pub seed_only: Option<bool>,
    /// Extract news article content (default false).
    #[serde(default)]
    pub news: Option<bool>,
    /// Delay between requests in seconds, 0-10 (default 1).
    #[serde(default)]
    #[schemars(range(min = 0, max = 10))]
    pub delay: Option<u32>,
    /// Per-request timeout in seconds, 5-60 (default 10).
    #[serde(default)]
    #[schemars(range(min = 5, max = 60))]
    pub timeout: Option<u32>,
    /// Verbose crawler diagnostics (default false).
    #[serde(default)]
    pub verbose: Option<bool>,
}

impl From<CrawlWebsiteArgs> for CrawlRequest {
    fn from(a: CrawlWebsiteArgs) -> Self {
        let d = CrawlRequest::new(a.url);
        Self {
            extract_links: a.extract_links.unwrap_or(d.extract_links),
            depth: a.depth.unwrap_or(d.depth),
            max_pages: a.max_pages.unwrap_or(d.max_pages),
            workers: a.workers.unwrap_or(d.workers),
            stay_domain: a.stay_domain.unwrap_or(d.stay_domain),
            filter: a.filter,
            seed_only: a.seed_only.unwrap_or(d.seed_only),
            news: a.news.unwrap_or(d.news),
            delay: a.delay.unwrap_or(d.delay),
            timeout: a.timeout.unwrap_or(d.timeout),
            verbose: a.verbose.unwrap_or(d.verbose),
            ..d
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QuickScrapeArgs {
    /// URL to scrape (must start with http:// or https://).
    pub url: String,
    /// Also extract the page's links (default false).
    #[serde(default)]
    pub extract_links: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetPageLinksArgs {
    /// URL to extract links from (must start with http:// or https://).
    pub url: String,
}

#[derive(Clone)]
pub struct CrawlerMcp {
    tool_router: ToolRouter<Self>,
    backend: Arc<dyn CrawlBackend>,
}

#[tool_router]
impl CrawlerMcp {
    pub fn new(backend: Arc<dyn CrawlBackend>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            backend,
        }
    }

    #[tool(
        description = "Crawl a website from a starting URL with full control over depth, page count, workers, domain scope, filtering and timing. Returns every crawled page as JSON."
    )]
    pub async fn crawl_website(
        &self,
        Parameters(args): Parameters<CrawlWebsiteArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = CrawlRequest::from(args);
        tracing::info!(tool = "crawl_website", backend = self.backend.name(), url = %req.url, "tool call");
        let outcome = match req.validated() {
            Ok(req) => self.backend.crawl(&req).await,
            Err(e) => Err(e),
        };
        Ok(envelope::render(Action::Crawl, outcome))
    }

    #[tool(
        description = "Scrape a single page (title, description, text content, optionally links). Faster than crawl_website for one URL."
    )]
    pub async fn quick_scrape(
        &self,
        Parameters(args): Parameters<QuickScrapeArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = ScrapeRequest {
            url: args.url,
            extract_links: args.extract_links.unwrap_or(false),
        };
        tracing::info!(tool = "quick_scrape", backend = self.backend.name(), url = %req.url, "tool call");
        let outcome = match req.validated() {
            Ok(req) => self.backend.scrape(&req).await,
            Err(e) => Err(e),
        };
        Ok(envelope::render(Action::Scrape, outcome))
    }

    #[tool(description = "List every link found on a single page, without its content.")]
    pub async fn get_page_links(
        &self,
        Parameters(args): Parameters<GetPageLinksArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = LinksRequest { url: args.url };
        tracing::info!(tool = "get_page_links", backend = self.backend.name(), url = %req.url, "tool call");
        let outcome = match req.validated() {
            Ok(req) => self.backend.links(&req).await,
            Err(e) => Err(e),
        };
        Ok(envelope::render(Action::Links, outcome))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for CrawlerMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Web crawling tools backed by an external crawler. Results are JSON text; failures are plain text starting with `Error` plus a hint."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn serve_stdio(backend: Arc<dyn CrawlBackend>) -> Result<(), McpError> {
    tracing::info!(backend = backend.name(), "mcp stdio server starting");
    let running = CrawlerMcp::new(backend)
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Runs until the client closes stdin.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}

/// Streamable HTTP transport mounted at `/mcp`, one [`CrawlerMcp`] per session.
pub fn http_router(backend: Arc<dyn CrawlBackend>) -> axum::Router {
    let service = StreamableHttpService::new(
        move || Ok(CrawlerMcp::new(backend.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    axum::Router::new().nest_service("/mcp", service)
}

pub async fn serve_http(addr: &str, backend: Arc<dyn CrawlBackend>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        backend = backend.name(),
        "mcp http server listening on /mcp"
    );
    axum::serve(listener, http_router(backend))
        .with_graceful_shutdown(crate::api::shutdown_signal())
        .await?;
    Ok(())
}
