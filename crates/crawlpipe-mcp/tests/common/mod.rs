#![allow(dead_code)]

use crawlpipe_core::TimeoutPolicy;
use crawlpipe_local::LocalCrawler;
use std::sync::Arc;
use std::time::Duration;

pub use crawlpipe_local::testutil::{three_pages_json, FakeCrawler, THREE_PAGES};

pub fn short_single_page_policy() -> TimeoutPolicy {
    TimeoutPolicy {
        single_page: Duration::from_secs(1),
        ..TimeoutPolicy::default()
    }
}

/// Serve the crawler API on an ephemeral port and return its base URL.
pub async fn spawn_api(crawler: Arc<LocalCrawler>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, crawlpipe::api::router(crawler))
            .await
            .expect("axum serve");
    });
    format!("http://{addr}")
}
