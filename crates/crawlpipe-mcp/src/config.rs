//! Startup configuration shared by the subcommands.

use crawlpipe_core::{TimeoutPolicy, DEFAULT_SINGLE_PAGE_TIMEOUT, DEFAULT_TIMEOUT_SLACK};
use crawlpipe_local::locate::DEFAULT_CRAWLER_BIN;
use crawlpipe_local::relay::{DEFAULT_API_URL, DEFAULT_RELAY_MARGIN};
use crawlpipe_local::{LocalCrawler, RelayCrawler};
use std::path::PathBuf;
use std::time::Duration;

/// Crawler time budgets. The relay takes the same flags so it can wait out the API.
#[derive(clap::Args, Debug, Clone)]
pub struct TimeoutArgs {
    /// Seconds added to every crawl budget (timeout x max_pages + slack).
    #[arg(long, env = "CRAWLPIPE_TIMEOUT_SLACK_S", default_value_t = DEFAULT_TIMEOUT_SLACK.as_secs())]
    pub timeout_slack_s: u64,
    /// Budget in seconds for single-page operations (scrape, links).
    #[arg(long, env = "CRAWLPIPE_SINGLE_PAGE_TIMEOUT_S", default_value_t = DEFAULT_SINGLE_PAGE_TIMEOUT.as_secs())]
    pub single_page_timeout_s: u64,
}

impl TimeoutArgs {
    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            slack: Duration::from_secs(self.timeout_slack_s),
            single_page: Duration::from_secs(self.single_page_timeout_s),
        }
    }
}

/// How to find and bound the crawler executable.
#[derive(clap::Args, Debug, Clone)]
pub struct CrawlerArgs {
    /// Crawler executable: a path, or a name looked up on PATH and next to this binary.
    #[arg(long, env = "CRAWLPIPE_CRAWLER_BIN", default_value = DEFAULT_CRAWLER_BIN)]
    pub crawler_bin: PathBuf,
    #[command(flatten)]
    pub timeouts: TimeoutArgs,
}

impl CrawlerArgs {
    pub fn policy(&self) -> TimeoutPolicy {
        self.timeouts.policy()
    }

    pub fn crawler(&self) -> LocalCrawler {
        LocalCrawler::from_config(&self.crawler_bin, self.policy())
    }
}

/// Where and how patiently to relay tool calls.
#[derive(clap::Args, Debug, Clone)]
pub struct RelayArgs {
    /// Base URL of the crawler HTTP API to relay to.
    #[arg(long, env = "CRAWLER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Seconds the relay waits past the API's own budget for each call.
    #[arg(long, env = "CRAWLPIPE_RELAY_MARGIN_S", default_value_t = DEFAULT_RELAY_MARGIN.as_secs())]
    pub relay_margin_s: u64,
    #[command(flatten)]
    pub timeouts: TimeoutArgs,
}

impl RelayArgs {
    pub fn relay(&self) -> crawlpipe_core::Result<RelayCrawler> {
        RelayCrawler::new(
            &self.api_url,
            self.timeouts.policy(),
            Duration::from_secs(self.relay_margin_s),
        )
    }
}

/// Load `KEY=VALUE` lines from `CRAWLPIPE_ENV_FILE`, if set.
///
/// Blank lines and `#` comments are skipped. Variables already present in the
/// process environment win. Values are never logged.
pub fn load_env_file() {
    let Ok(p) = std::env::var("CRAWLPIPE_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for (k, v) in parse_env_lines(&txt) {
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn parse_env_lines(txt: &str) -> Vec<(&str, &str)> {
    txt.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .filter_map(|s| s.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}
