//! Shell-script stand-in for the crawler executable.
//!
//! Built for this crate's tests and, with the `test-util` feature, for downstream integration tests.

use crate::LocalCrawler;
use crawlpipe_core::TimeoutPolicy;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PRELUDE: &str = r#"#!/bin/sh
here="$(dirname "$0")"
printf '%s\n' "$@" > "$here/args.txt"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-output" ]; then out="$a"; fi
  prev="$a"
done
printf '%s' "$out" > "$here/channel.txt"
echo $$ > "$here/pid.txt"
"#;

pub struct FakeCrawler {
    dir: tempfile::TempDir,
    bin: PathBuf,
}

impl FakeCrawler {
    fn with_body(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let bin = dir.path().join("gocrawler");
        std::fs::write(&bin, format!("{PRELUDE}{body}\n")).expect("write script");
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        Self { dir, bin }
    }

    /// Writes `json` verbatim to the declared output path and exits 0.
    pub fn writing(json: &str) -> Self {
        let me = Self::with_body(r#"cat "$here/fixture.json" > "$out""#);
        std::fs::write(me.dir.path().join("fixture.json"), json).expect("write fixture");
        me
    }

    pub fn failing(stderr: &str, code: i32) -> Self {
        Self::with_body(&format!("printf '%s\\n' '{stderr}' >&2\nexit {code}"))
    }

    pub fn hanging() -> Self {
        Self::with_body("exec sleep 30")
    }

    pub fn path(&self) -> &Path {
        &self.bin
    }

    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn crawler(&self) -> Arc<LocalCrawler> {
        self.crawler_with(TimeoutPolicy::default())
    }

    pub fn crawler_with(&self, policy: TimeoutPolicy) -> Arc<LocalCrawler> {
        Arc::new(LocalCrawler::new(self.path(), policy))
    }

    pub fn recorded_channel(&self) -> Option<PathBuf> {
        std::fs::read_to_string(self.dir.path().join("channel.txt"))
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn recorded_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.dir.path().join("pid.txt"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

pub const THREE_PAGES: &str = r#"[
  {"url":"https://example.com/","title":"Home","description":"Front page","content":"hello","links":["https://example.com/a","https://example.com/b"],"crawled_at":"2024-05-01T10:00:00Z","depth":0},
  {"url":"https://example.com/a","title":"A","description":"","crawled_at":"2024-05-01T10:00:01Z","depth":1},
  {"url":"https://example.com/b","title":"B","description":"b page","links":[],"crawled_at":"2024-05-01T10:00:02Z","depth":1}
]"#;

/// The fixture's records as JSON values, for field-by-field comparison.
pub fn three_pages_json() -> Vec<serde_json::Value> {
    serde_json::from_str(THREE_PAGES).expect("fixture json")
}

/// True while `pid` exists and is not a zombie.
#[cfg(target_os = "linux")]
pub fn process_is_running(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next())
        .is_some_and(|state| state != 'Z')
}
