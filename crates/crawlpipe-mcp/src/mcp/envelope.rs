use crawlpipe_core::{Error, ErrorKind, Result};
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

/// What a tool was doing, for the `Error <action>: ...` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Crawl,
    Scrape,
    Links,
}

impl Action {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Crawl => "crawling website",
            Self::Scrape => "scraping page",
            Self::Links => "extracting links",
        }
    }
}

pub(crate) fn error_hint(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => {
            "Check that url starts with http:// or https:// and that numeric arguments are within their documented ranges."
        }
        ErrorKind::Timeout => {
            "The crawl ran out of time. Reduce max_pages or timeout, or use quick_scrape for a single page."
        }
        ErrorKind::Executor => {
            "The crawler exited with an error. Check that the URL is reachable and try again."
        }
        ErrorKind::MalformedOutput => {
            "The crawler produced unreadable output. Retry with verbose=true to see its diagnostics."
        }
        ErrorKind::EmptyResult => {
            "The page returned nothing to extract. Check that the URL serves HTML and is not blocked."
        }
        ErrorKind::Upstream => {
            "The crawler API is unreachable or failing. Check CRAWLER_API_URL and that the API is running."
        }
    }
}

pub(crate) fn error_text(action: Action, err: &Error) -> String {
    let headline = match err {
        Error::EmptyResult => "No data returned from the page".to_string(),
        _ => format!("Error {}: {err}", action.as_str()),
    };
    format!("{headline}\nHint: {}", error_hint(err.kind()))
}

/// Tool output: pretty JSON on success, error text otherwise. Never a protocol error.
pub(crate) fn render<T: Serialize>(action: Action, outcome: Result<T>) -> CallToolResult {
    let text = match outcome {
        Ok(v) => serde_json::to_string_pretty(&v).unwrap_or_else(|e| {
            error_text(action, &Error::MalformedOutput(e.to_string()))
        }),
        Err(e) => {
            tracing::warn!(action = action.as_str(), kind = e.kind().as_str(), error = %e, "tool call failed");
            error_text(action, &e)
        }
    };
    CallToolResult::success(vec![Content::text(text)])
}
