//! Bounded execution of the crawler executable.
//!
//! Goals:
//! - **Bounded**: the child is waited on against a [`Deadline`]; on expiry it is killed and reaped.
//! - **Scoped**: the output channel and the child live inside one call. Every exit path
//!   (success, non-zero exit, timeout, early `?`, or the future being dropped) deletes the
//!   channel and leaves no running process.
//! - **Uninterpreted**: this module reports what happened; [`crate::interpret`] decides what it means.

use crawlpipe_core::{Deadline, Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Only the tail of the crawler's stderr is kept.
const MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;
/// How long to keep draining stderr after the child exited (grandchildren may hold the pipe).
const DIAGNOSTIC_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Uniquely named temporary file the crawler writes its JSON array into.
///
/// Names are random and created exclusively, so concurrent calls never collide.
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct OutputChannel {
    path: tempfile::TempPath,
}

impl OutputChannel {
    pub fn allocate() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("crawlpipe-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| Error::Executor(format!("could not allocate output channel: {e}")))?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The process ended on its own. `code` is `None` when it was killed by a signal.
    Exited { code: Option<i32> },
    /// The deadline expired and the process was killed.
    TimedOut(Duration),
}

impl RunExit {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub exit: RunExit,
    /// Trimmed tail of stderr.
    pub diagnostics: String,
    /// Channel contents; only read after a zero exit.
    pub contents: Vec<u8>,
    pub elapsed: Duration,
    /// Where the channel lived. It no longer exists once the report is returned.
    pub channel: PathBuf,
}

/// Launch `executable -output <channel> <tokens...>` and wait for it until `deadline`.
pub async fn run(executable: &Path, tokens: &[String], deadline: Deadline) -> Result<RunReport> {
    let channel = OutputChannel::allocate()?;
    let t0 = Instant::now();

    let mut child = tokio::process::Command::new(executable)
        .arg("-output")
        .arg(channel.path())
        .args(tokens)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            Error::Executor(format!(
                "failed to launch crawler {}: {e}",
                executable.display()
            ))
        })?;
    tracing::info!(
        pid = child.id(),
        budget = ?deadline.budget(),
        args = %tokens.join(" "),
        "crawler launched"
    );

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Executor("crawler stderr pipe missing".to_string()))?;
    let mut stderr_task = tokio::spawn(drain_tail(stderr, MAX_DIAGNOSTIC_BYTES));

    let expires_at = tokio::time::Instant::from_std(deadline.expires_at());
    let exit = match tokio::time::timeout_at(expires_at, child.wait()).await {
        Ok(status) => {
            let status = status
                .map_err(|e| Error::Executor(format!("failed waiting for crawler: {e}")))?;
            RunExit::Exited {
                code: status.code(),
            }
        }
        Err(_) => {
            tracing::warn!(budget = ?deadline.budget(), "crawler exceeded its budget, killing it");
            // `kill` waits for the child too, so nothing is left as a zombie.
            if let Err(e) = child.kill().await {
                tracing::error!(error = %e, "failed to kill timed-out crawler");
            }
            stderr_task.abort();
            return Ok(RunReport {
                exit: RunExit::TimedOut(deadline.budget()),
                diagnostics: String::new(),
                contents: Vec::new(),
                elapsed: t0.elapsed(),
                channel: channel.path().to_path_buf(),
            });
        }
    };

    let diagnostics = match tokio::time::timeout(DIAGNOSTIC_DRAIN_GRACE, &mut stderr_task).await {
        Ok(Ok(tail)) => String::from_utf8_lossy(&tail).trim().to_string(),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            stderr_task.abort();
            String::new()
        }
    };

    let contents = if exit.is_success() {
        tokio::fs::read(channel.path()).await.map_err(|e| {
            Error::MalformedOutput(format!("could not read output channel: {e}"))
        })?
    } else {
        Vec::new()
    };

    let elapsed = t0.elapsed();
    tracing::info!(
        ?exit,
        elapsed_ms = elapsed.as_millis() as u64,
        output_bytes = contents.len(),
        "crawler finished"
    );
    Ok(RunReport {
        exit,
        diagnostics,
        contents,
        elapsed,
        channel: channel.path().to_path_buf(),
    })
}

async fn drain_tail<R: AsyncRead + Unpin>(mut r: R, cap: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match r.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > cap {
                    kept.drain(..kept.len() - cap);
                }
            }
        }
    }
    kept
}
